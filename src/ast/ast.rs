use std::fmt::{self, Display};

use crate::{
    compiler::{compiler::Compiler, stmt::gen_statement, types::TypedValue},
    Span, MK_NODE,
};

use super::{
    expressions::{write_list, BinOp, BinOpNode, CallNode, ExprIfNode, TupleNode, UnOp},
    statements::{DataDecl, ExtNode, FuncDecl, IfNode, LetBinding, VarAssign, VarDecl, WhileNode},
    types::{Modifier, TypeNode, TypeTag},
};

/// A single node of the syntax tree together with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// The closed set of node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    IntLit { value: String, type_tag: TypeTag },
    FltLit { value: String, type_tag: TypeTag },
    BoolLit(bool),
    StrLit(String),
    /// Homogeneous array literal.
    Array(Vec<Node>),
    Tuple(TupleNode),
    TypeCast { type_expr: TypeNode, expr: Box<Node> },
    UnOp { op: UnOp, expr: Box<Node> },
    BinOp(BinOpNode),
    /// Reads the value of a variable.
    Var(String),
    /// Yields the address of a mutable variable.
    RefVar(String),
    Let(LetBinding),
    VarDecl(VarDecl),
    Assign(VarAssign),
    If(IfNode),
    ExprIf(ExprIfNode),
    While(WhileNode),
    Return(Option<Box<Node>>),
    /// A nested block with its own scope.
    Block(Block),
    FuncDecl(FuncDecl),
    DataDecl(DataDecl),
    Ext(ExtNode),
    Import(Box<Node>),
    Mod(Modifier),
    Call(CallNode),
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        MK_NODE!(kind, span)
    }

    pub fn int(value: &str, type_tag: TypeTag, span: Span) -> Self {
        Node::new(
            NodeKind::IntLit {
                value: value.to_string(),
                type_tag,
            },
            span,
        )
    }

    pub fn float(value: &str, type_tag: TypeTag, span: Span) -> Self {
        Node::new(
            NodeKind::FltLit {
                value: value.to_string(),
                type_tag,
            },
            span,
        )
    }

    pub fn var(name: &str, span: Span) -> Self {
        Node::new(NodeKind::Var(name.to_string()), span)
    }

    pub fn binop(op: BinOp, lhs: Node, rhs: Node, span: Span) -> Self {
        Node::new(
            NodeKind::BinOp(BinOpNode {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }),
            span,
        )
    }

    pub fn call(callee: &str, args: Vec<Node>, span: Span) -> Self {
        Node::new(
            NodeKind::Call(CallNode {
                callee: callee.to_string(),
                args: TupleNode::new(args),
            }),
            span,
        )
    }

    pub fn let_binding(name: &str, expr: Node, span: Span) -> Self {
        Node::new(
            NodeKind::Let(LetBinding {
                name: name.to_string(),
                modifiers: vec![],
                type_expr: None,
                expr: Box::new(expr),
            }),
            span,
        )
    }

    pub fn ret(expr: Option<Node>, span: Span) -> Self {
        Node::new(NodeKind::Return(expr.map(Box::new)), span)
    }

    /// Compiles this node into the current insertion point of `compiler`.
    ///
    /// Never aborts: failures are recorded on the compiler and an error
    /// value is returned instead.
    pub fn compile<'ctx, 'ast>(&'ast self, compiler: &mut Compiler<'ctx, 'ast>) -> TypedValue<'ctx> {
        gen_statement(compiler, self)
    }

    /// Prints a structural dump of the node.
    pub fn print(&self) {
        println!("{}", self);
    }

    /// Declarations are hoisted and produce no value where they appear.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::FuncDecl(_) | NodeKind::DataDecl(_) | NodeKind::Ext(_)
        )
    }
}

/// An ordered sequence of statements. Order is execution order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub body: Vec<Node>,
    pub span: Span,
}

impl Block {
    pub fn new(body: Vec<Node>, span: Span) -> Self {
        Block { body, span }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.body.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn print(&self) {
        for node in self.body.iter() {
            node.print();
        }
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for node in self.body.iter() {
            write!(f, " {};", node)?;
        }
        write!(f, " }}")
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::IntLit { value, type_tag } => write!(f, "{}{}", value, type_tag),
            NodeKind::FltLit { value, type_tag } => write!(f, "{}{}", value, type_tag),
            NodeKind::BoolLit(value) => write!(f, "{}", value),
            NodeKind::StrLit(value) => write!(f, "{:?}", value),
            NodeKind::Array(elements) => {
                write!(f, "[")?;
                write_list(f, elements)?;
                write!(f, "]")
            }
            NodeKind::Tuple(tuple) => write!(f, "{}", tuple),
            NodeKind::TypeCast { type_expr, expr } => write!(f, "{}({})", type_expr, expr),
            NodeKind::UnOp { op, expr } => write!(f, "({} {})", op, expr),
            NodeKind::BinOp(binop) => write!(f, "({} {} {})", binop.op, binop.lhs, binop.rhs),
            NodeKind::Var(name) => write!(f, "{}", name),
            NodeKind::RefVar(name) => write!(f, "&{}", name),
            NodeKind::Let(binding) => write!(f, "{}", binding),
            NodeKind::VarDecl(decl) => write!(f, "{}", decl),
            NodeKind::Assign(assign) => write!(f, "{} := {}", assign.target, assign.expr),
            NodeKind::If(if_node) => write!(f, "{}", if_node),
            NodeKind::ExprIf(if_expr) => write!(
                f,
                "(if {} then {} else {})",
                if_expr.condition, if_expr.then_branch, if_expr.else_branch
            ),
            NodeKind::While(while_node) => {
                write!(f, "while {} {}", while_node.condition, while_node.body)
            }
            NodeKind::Return(Some(expr)) => write!(f, "return {}", expr),
            NodeKind::Return(None) => write!(f, "return"),
            NodeKind::Block(block) => write!(f, "{}", block),
            NodeKind::FuncDecl(decl) => write!(f, "{}", decl),
            NodeKind::DataDecl(decl) => write!(f, "{}", decl),
            NodeKind::Ext(ext) => write!(f, "{}", ext),
            NodeKind::Import(expr) => write!(f, "import {}", expr),
            NodeKind::Mod(modifier) => write!(f, "{}", modifier),
            NodeKind::Call(call) => write!(f, "{}{}", call.callee, call.args),
        }
    }
}
