//! Function registry.
//!
//! Function declarations are registered by name before their bodies are
//! compiled, which lets calls resolve forward references and mutual
//! recursion. A declaration is compiled at most once: the first call (or the
//! final sweep after the top-level walk) promotes it from declared to defined.

use std::collections::{HashMap, HashSet};

use inkwell::values::FunctionValue;

use crate::{ast::statements::FuncDecl, errors::errors::ErrorImpl};

use super::types::FnSig;

/// A function that exists in the module.
#[derive(Debug, Clone)]
pub struct FnEntry<'ctx> {
    pub value: FunctionValue<'ctx>,
    pub sig: FnSig,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry<'ctx, 'ast> {
    declared: HashMap<String, &'ast FuncDecl>,
    /// Declaration order, so the final sweep is deterministic.
    order: Vec<String>,
    defined: HashMap<String, FnEntry<'ctx>>,
    failed: HashSet<String>,
}

impl<'ctx, 'ast> FunctionRegistry<'ctx, 'ast> {
    pub fn new() -> Self {
        FunctionRegistry {
            declared: HashMap::new(),
            order: Vec::new(),
            defined: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Registers `decl` under `symbol` without compiling it.
    pub fn declare(&mut self, symbol: &str, decl: &'ast FuncDecl) -> Result<(), ErrorImpl> {
        if self.contains(symbol) {
            return Err(ErrorImpl::FunctionAlreadyDeclared {
                function: symbol.to_string(),
            });
        }

        self.declared.insert(symbol.to_string(), decl);
        self.order.push(symbol.to_string());
        Ok(())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.declared.contains_key(symbol)
            || self.defined.contains_key(symbol)
            || self.failed.contains(symbol)
    }

    pub fn is_declared(&self, symbol: &str) -> bool {
        self.declared.contains_key(symbol)
    }

    pub fn get_defined(&self, symbol: &str) -> Option<&FnEntry<'ctx>> {
        self.defined.get(symbol)
    }

    pub fn is_defined(&self, symbol: &str) -> bool {
        self.defined.contains_key(symbol)
    }

    pub fn is_failed(&self, symbol: &str) -> bool {
        self.failed.contains(symbol)
    }

    /// Removes a pending declaration so it can be compiled.
    pub fn take_declared(&mut self, symbol: &str) -> Option<&'ast FuncDecl> {
        self.declared.remove(symbol)
    }

    pub fn define(&mut self, symbol: &str, entry: FnEntry<'ctx>) {
        self.defined.insert(symbol.to_string(), entry);
    }

    pub(crate) fn forget_defined(&mut self, symbol: &str) {
        self.defined.remove(symbol);
    }

    pub fn mark_failed(&mut self, symbol: &str) {
        self.failed.insert(symbol.to_string());
    }

    /// The next declaration that was never compiled, in declaration order.
    pub fn next_pending(&mut self) -> Option<(String, &'ast FuncDecl)> {
        while !self.order.is_empty() {
            let symbol = self.order.remove(0);
            if let Some(decl) = self.declared.remove(&symbol) {
                return Some((symbol, decl));
            }
        }
        None
    }

    pub fn pending_count(&self) -> usize {
        self.declared.len()
    }
}
