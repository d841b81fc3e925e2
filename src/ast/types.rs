//! Surface type vocabulary of the AST.
//!
//! This module defines the type annotations written in source code:
//!
//! - Primitive type tags (integers, floats, characters, booleans, strings)
//! - Type expressions (`TypeNode`) naming primitives, user types, or
//!   pointer/container types wrapping an inner type expression
//! - Declaration modifiers
//!
//! Type expressions are resolved into semantic types by the compiler.

use std::fmt::{self, Display};

use crate::Span;

/// Primitive type tags of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    I8,
    I16,
    I32,
    I64,
    Isz,
    U8,
    U16,
    U32,
    U64,
    Usz,
    F16,
    F32,
    F64,
    C8,
    C32,
    Bool,
    Str,
    Void,
}

impl TypeTag {
    /// Bit width of integer-like tags. Characters count as unsigned integers.
    pub fn int_width(self) -> Option<u32> {
        match self {
            TypeTag::I8 | TypeTag::U8 | TypeTag::C8 => Some(8),
            TypeTag::I16 | TypeTag::U16 => Some(16),
            TypeTag::I32 | TypeTag::U32 | TypeTag::C32 => Some(32),
            TypeTag::I64 | TypeTag::U64 | TypeTag::Isz | TypeTag::Usz => Some(64),
            _ => None,
        }
    }

    pub fn float_width(self) -> Option<u32> {
        match self {
            TypeTag::F16 => Some(16),
            TypeTag::F32 => Some(32),
            TypeTag::F64 => Some(64),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        self.int_width().is_some()
    }

    pub fn is_float(self) -> bool {
        self.float_width().is_some()
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            TypeTag::I8 | TypeTag::I16 | TypeTag::I32 | TypeTag::I64 | TypeTag::Isz
        )
    }

    /// The signed or unsigned integer tag of the given width.
    pub fn int_of_width(bits: u32, signed: bool) -> Option<TypeTag> {
        match (bits, signed) {
            (8, true) => Some(TypeTag::I8),
            (16, true) => Some(TypeTag::I16),
            (32, true) => Some(TypeTag::I32),
            (64, true) => Some(TypeTag::I64),
            (8, false) => Some(TypeTag::U8),
            (16, false) => Some(TypeTag::U16),
            (32, false) => Some(TypeTag::U32),
            (64, false) => Some(TypeTag::U64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::Isz => "isz",
            TypeTag::U8 => "u8",
            TypeTag::U16 => "u16",
            TypeTag::U32 => "u32",
            TypeTag::U64 => "u64",
            TypeTag::Usz => "usz",
            TypeTag::F16 => "f16",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
            TypeTag::C8 => "c8",
            TypeTag::C32 => "c32",
            TypeTag::Bool => "bool",
            TypeTag::Str => "Str",
            TypeTag::Void => "void",
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A type expression as written in source.
///
/// This is a finite tree: every extension variant owns its inner type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Primitive(TypeTag),
    /// A user-defined type, resolved by name.
    Named(String),
    Ptr(Box<TypeNode>),
    Array(Box<TypeNode>, u32),
    Tuple(Vec<TypeNode>),
}

impl TypeNode {
    pub fn ptr(inner: TypeNode) -> Self {
        TypeNode::Ptr(Box::new(inner))
    }

    pub fn array(inner: TypeNode, len: u32) -> Self {
        TypeNode::Array(Box::new(inner), len)
    }

    pub fn named(name: &str) -> Self {
        TypeNode::Named(name.to_string())
    }
}

impl Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Primitive(tag) => write!(f, "{}", tag),
            TypeNode::Named(name) => write!(f, "{}", name),
            TypeNode::Ptr(inner) => write!(f, "{}*", inner),
            TypeNode::Array(inner, len) => write!(f, "[{}; {}]", inner, len),
            TypeNode::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Modifiers that can precede a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Pub,
    Pri,
    Pro,
    Const,
    Mut,
    Ext,
    Noinit,
}

impl Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modifier::Pub => "pub",
            Modifier::Pri => "pri",
            Modifier::Pro => "pro",
            Modifier::Const => "const",
            Modifier::Mut => "mut",
            Modifier::Ext => "ext",
            Modifier::Noinit => "noinit",
        };
        write!(f, "{}", name)
    }
}

/// A named, typed slot: a function parameter or a record field.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedVal {
    pub name: String,
    pub type_expr: TypeNode,
    pub span: Span,
}

impl NamedVal {
    pub fn new(name: &str, type_expr: TypeNode, span: Span) -> Self {
        NamedVal {
            name: name.to_string(),
            type_expr,
            span,
        }
    }
}

impl Display for NamedVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_expr)
    }
}
