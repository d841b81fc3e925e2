//! Lexical scope tracking for the code generator.
//!
//! Scopes form a stack of name → variable frames with the innermost frame
//! last. Lookups search from the innermost frame outwards, so an inner
//! binding shadows an outer one until its frame is popped.

use std::collections::HashMap;

use inkwell::values::BasicValueEnum;
use log::{trace, warn};

use crate::errors::errors::ErrorImpl;

use super::types::Type;

/// A bound name.
///
/// Mutable variables live in a stack slot: `value` is the slot pointer and
/// `ty` is the type stored in it. Immutable bindings hold the value itself.
#[derive(Debug, Clone)]
pub struct Variable<'ctx> {
    pub value: BasicValueEnum<'ctx>,
    pub ty: Type,
    pub mutable: bool,
}

impl<'ctx> Variable<'ctx> {
    pub fn immutable(value: BasicValueEnum<'ctx>, ty: Type) -> Self {
        Variable {
            value,
            ty,
            mutable: false,
        }
    }

    pub fn mutable(slot: BasicValueEnum<'ctx>, ty: Type) -> Self {
        Variable {
            value: slot,
            ty,
            mutable: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack<'ctx> {
    frames: Vec<HashMap<String, Variable<'ctx>>>,
    entered: usize,
    exited: usize,
}

impl<'ctx> ScopeStack<'ctx> {
    pub fn new() -> Self {
        ScopeStack {
            frames: Vec::new(),
            entered: 0,
            exited: 0,
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(HashMap::new());
        self.entered += 1;
        trace!("entered scope (depth {})", self.frames.len());
    }

    /// Pops the innermost frame and every binding in it.
    pub fn exit_scope(&mut self) {
        if self.frames.pop().is_some() {
            self.exited += 1;
            trace!("exited scope (depth {})", self.frames.len());
        }
    }

    /// Finds the nearest binding of `name`, innermost frame first.
    pub fn lookup(&self, name: &str) -> Result<&Variable<'ctx>, ErrorImpl> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .ok_or_else(|| ErrorImpl::VariableNotDeclared {
                variable: name.to_string(),
            })
    }

    /// Binds `name` in the innermost frame, replacing any binding of the same
    /// name in that frame. Outer frames are never touched.
    pub fn bind(&mut self, name: &str, variable: Variable<'ctx>) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.to_string(), variable);
            }
            None => warn!("binding `{}` with no open scope", name),
        }
    }

    pub fn is_bound_in_current(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.contains_key(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Number of `enter_scope` and `exit_scope` calls so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.entered, self.exited)
    }

    /// Sets every frame aside, leaving an empty stack.
    ///
    /// Used while a function body compiles: it must not see its caller's locals.
    pub(crate) fn take_frames(&mut self) -> Vec<HashMap<String, Variable<'ctx>>> {
        std::mem::take(&mut self.frames)
    }

    pub(crate) fn restore_frames(&mut self, frames: Vec<HashMap<String, Variable<'ctx>>>) {
        self.frames = frames;
    }
}
