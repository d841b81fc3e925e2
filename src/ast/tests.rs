//! Unit tests for the AST module.
//!
//! This module contains tests for node construction, the structural dump
//! and the helpers on type tags and declarations.

use super::{
    ast::{Block, Node, NodeKind},
    expressions::{BinOp, UnOp},
    statements::{DataDecl, ElseBranch, FuncDecl, IfNode, VarDecl},
    types::{Modifier, NamedVal, TypeNode, TypeTag},
};
use crate::{Span, MK_NODE};

fn span() -> Span {
    Span::at(1, 1)
}

#[test]
fn test_display_binop() {
    let node = Node::binop(
        BinOp::Add,
        Node::int("1", TypeTag::I32, span()),
        Node::var("x", span()),
        span(),
    );

    assert_eq!(node.to_string(), "(+ 1i32 x)");
}

#[test]
fn test_display_call_and_unop() {
    let call = Node::call(
        "print",
        vec![
            MK_NODE!(NodeKind::StrLit("hi".to_string()), span()),
            MK_NODE!(
                NodeKind::UnOp {
                    op: UnOp::Neg,
                    expr: Box::new(Node::var("n", span())),
                },
                span()
            ),
        ],
        span(),
    );

    assert_eq!(call.to_string(), "print(\"hi\", (- n))");
}

#[test]
fn test_display_let_and_block() {
    let block = Block::new(
        vec![
            Node::let_binding("x", Node::int("3", TypeTag::I8, span()), span()),
            Node::ret(Some(Node::var("x", span())), span()),
        ],
        span(),
    );

    assert_eq!(block.to_string(), "{ let x = 3i8; return x; }");
}

#[test]
fn test_display_var_decl_with_modifiers() {
    let decl = MK_NODE!(
        NodeKind::VarDecl(VarDecl {
            name: "buf".to_string(),
            modifiers: vec![Modifier::Noinit],
            type_expr: Some(TypeNode::array(TypeNode::Primitive(TypeTag::U8), 4)),
            expr: None,
        }),
        span()
    );

    assert_eq!(decl.to_string(), "noinit var buf: [u8; 4]");
}

#[test]
fn test_display_if_else_chain() {
    let inner = IfNode {
        condition: Box::new(Node::var("b", span())),
        body: Block::default(),
        else_branch: None,
    };
    let outer = MK_NODE!(
        NodeKind::If(IfNode {
            condition: Box::new(Node::var("a", span())),
            body: Block::default(),
            else_branch: Some(ElseBranch::If(Box::new(inner))),
        }),
        span()
    );

    assert_eq!(outer.to_string(), "if a { } else if b { }");
}

#[test]
fn test_display_func_decl() {
    let decl = FuncDecl {
        name: "printf".to_string(),
        modifiers: vec![],
        return_type: Some(TypeNode::Primitive(TypeTag::I32)),
        params: vec![NamedVal::new(
            "fmt",
            TypeNode::Primitive(TypeTag::Str),
            span(),
        )],
        body: None,
        varargs: true,
        span: span(),
    };

    assert_eq!(decl.to_string(), "fun printf(fmt: Str, ...) -> i32");
}

#[test]
fn test_type_node_display() {
    let ty = TypeNode::Tuple(vec![
        TypeNode::ptr(TypeNode::named("Point")),
        TypeNode::Primitive(TypeTag::F64),
    ]);

    assert_eq!(ty.to_string(), "(Point*, f64)");
}

#[test]
fn test_type_tag_widths() {
    assert_eq!(TypeTag::Isz.int_width(), Some(64));
    assert_eq!(TypeTag::C8.int_width(), Some(8));
    assert_eq!(TypeTag::F16.float_width(), Some(16));
    assert_eq!(TypeTag::Bool.int_width(), None);
    assert!(TypeTag::I16.is_signed());
    assert!(!TypeTag::Usz.is_signed());
    assert_eq!(TypeTag::int_of_width(16, false), Some(TypeTag::U16));
    assert_eq!(TypeTag::int_of_width(1, true), None);
}

#[test]
fn test_declarations_are_hoistable() {
    let data = MK_NODE!(
        NodeKind::DataDecl(DataDecl {
            name: "Point".to_string(),
            fields: vec![
                NamedVal::new("x", TypeNode::Primitive(TypeTag::I32), span()),
                NamedVal::new("y", TypeNode::Primitive(TypeTag::I32), span()),
            ],
        }),
        span()
    );

    assert!(data.is_declaration());
    assert!(!Node::var("x", span()).is_declaration());
    if let NodeKind::DataDecl(decl) = &data.kind {
        assert_eq!(decl.field_count(), 2);
    }
}

#[test]
fn test_func_decl_modifiers() {
    let decl = FuncDecl {
        name: "helper".to_string(),
        modifiers: vec![Modifier::Pri],
        return_type: None,
        params: vec![],
        body: Some(Block::default()),
        varargs: false,
        span: span(),
    };

    assert!(decl.has_modifier(Modifier::Pri));
    assert!(!decl.has_modifier(Modifier::Pub));
    assert_eq!(decl.to_string(), "pri fun helper() { }");
}
