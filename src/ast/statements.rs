use std::fmt::{self, Display};

use crate::Span;

use super::{
    ast::{Block, Node},
    types::{Modifier, NamedVal, TypeNode},
};

/// Immutable introduction of a name: `let x = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub type_expr: Option<TypeNode>,
    pub expr: Box<Node>,
}

/// Mutable variable declaration. Needs a type or an initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    pub type_expr: Option<TypeNode>,
    pub expr: Option<Box<Node>>,
}

/// Assignment through an addressable target. The target is always owned.
#[derive(Debug, Clone, PartialEq)]
pub struct VarAssign {
    pub target: Box<Node>,
    pub expr: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: Box<Node>,
    pub body: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    /// `else if ...`
    If(Box<IfNode>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub condition: Box<Node>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub modifiers: Vec<Modifier>,
    /// `None` means the function returns void.
    pub return_type: Option<TypeNode>,
    pub params: Vec<NamedVal>,
    /// `None` declares an external function.
    pub body: Option<Block>,
    pub varargs: bool,
    pub span: Span,
}

impl FuncDecl {
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

/// A record type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDecl {
    pub name: String,
    pub fields: Vec<NamedVal>,
}

impl DataDecl {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Methods attached to an existing type.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtNode {
    pub type_expr: TypeNode,
    pub methods: Vec<FuncDecl>,
}

fn write_modifiers(f: &mut fmt::Formatter<'_>, modifiers: &[Modifier]) -> fmt::Result {
    for modifier in modifiers {
        write!(f, "{} ", modifier)?;
    }
    Ok(())
}

impl Display for IfNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {} {}", self.condition, self.body)?;
        match &self.else_branch {
            Some(ElseBranch::If(elif)) => write!(f, " else {}", elif),
            Some(ElseBranch::Block(block)) => write!(f, " else {}", block),
            None => Ok(()),
        }
    }
}

impl Display for FuncDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_modifiers(f, &self.modifiers)?;
        write!(f, "fun {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        if self.varargs {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")?;
        if let Some(return_type) = &self.return_type {
            write!(f, " -> {}", return_type)?;
        }
        match &self.body {
            Some(body) => write!(f, " {}", body),
            None => Ok(()),
        }
    }
}

impl Display for LetBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_modifiers(f, &self.modifiers)?;
        write!(f, "let {}", self.name)?;
        if let Some(type_expr) = &self.type_expr {
            write!(f, ": {}", type_expr)?;
        }
        write!(f, " = {}", self.expr)
    }
}

impl Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_modifiers(f, &self.modifiers)?;
        write!(f, "var {}", self.name)?;
        if let Some(type_expr) = &self.type_expr {
            write!(f, ": {}", type_expr)?;
        }
        match &self.expr {
            Some(expr) => write!(f, " = {}", expr),
            None => Ok(()),
        }
    }
}

impl Display for DataDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {} = ", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

impl Display for ExtNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ext {} {{", self.type_expr)?;
        for method in &self.methods {
            write!(f, " {};", method)?;
        }
        write!(f, " }}")
    }
}
