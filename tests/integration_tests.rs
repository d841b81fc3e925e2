//! Integration tests for end-to-end compilation.
//!
//! These tests build statement blocks by hand, the way an external parser
//! would hand them over, and drive them through the compilation pipeline:
//! prelude merging, code generation and optimisation. Nothing here needs
//! `llc` or a linker.

use std::path::{Path, PathBuf};
use inkwell::values::AnyValue;

use antec::{
    ast::{
        ast::{Block, Node, NodeKind},
        expressions::{BinOp, ExprIfNode, TupleNode},
        statements::{
            DataDecl, ElseBranch, ExtNode, FuncDecl, IfNode, VarAssign, VarDecl, WhileNode,
        },
        types::{NamedVal, TypeNode, TypeTag},
    },
    compiler::{
        compiler::{compile_file, Compiler, PipelineState},
        options::{CompileOptions, OptLevel},
        prelude::IrSourcePrelude,
    },
    errors::errors::{ParseErr, PipelineError},
    parser::ParseError,
    Position, Span,
};
use inkwell::context::Context;

fn at(row: u32, col: u32) -> Span {
    Span::at(row, col)
}

fn int(value: &str) -> Node {
    Node::int(value, TypeTag::I32, at(1, 1))
}

fn var(name: &str) -> Node {
    Node::var(name, at(1, 1))
}

fn bin(op: BinOp, lhs: Node, rhs: Node) -> Node {
    Node::binop(op, lhs, rhs, at(1, 1))
}

fn func_decl(
    name: &str,
    params: &[(&str, TypeTag)],
    ret: Option<TypeTag>,
    body: Vec<Node>,
) -> FuncDecl {
    FuncDecl {
        name: name.to_string(),
        modifiers: vec![],
        return_type: ret.map(TypeNode::Primitive),
        params: params
            .iter()
            .map(|(name, tag)| NamedVal::new(name, TypeNode::Primitive(*tag), at(1, 1)))
            .collect(),
        body: Some(Block::new(body, at(1, 1))),
        varargs: false,
        span: at(1, 1),
    }
}

fn fun(name: &str, params: &[(&str, TypeTag)], ret: Option<TypeTag>, body: Vec<Node>) -> Node {
    Node::new(
        NodeKind::FuncDecl(func_decl(name, params, ret, body)),
        at(1, 1),
    )
}

fn block_node(body: Vec<Node>) -> Node {
    Node::new(NodeKind::Block(Block::new(body, at(1, 1))), at(1, 1))
}

fn point_decl() -> Node {
    Node::new(
        NodeKind::DataDecl(DataDecl {
            name: "Point".to_string(),
            fields: vec![NamedVal::new("x", TypeNode::Primitive(TypeTag::I32), at(1, 1))],
        }),
        at(1, 1),
    )
}

fn var_decl(name: &str, type_expr: Option<TypeNode>, expr: Option<Node>, span: Span) -> Node {
    Node::new(
        NodeKind::VarDecl(VarDecl {
            name: name.to_string(),
            modifiers: vec![],
            type_expr,
            expr: expr.map(Box::new),
        }),
        span,
    )
}

fn error_names(compiler: &Compiler<'_, '_>) -> Vec<String> {
    compiler
        .errors()
        .iter()
        .map(|error| error.get_error_name().to_string())
        .collect()
}

/// `fun is_even(n: i32) -> bool { if n == 0 { return true; } return is_odd(n - 1); }`
fn parity(name: &str, other: &str, base: bool) -> Node {
    fun(
        name,
        &[("n", TypeTag::I32)],
        Some(TypeTag::Bool),
        vec![
            Node::new(
                NodeKind::If(IfNode {
                    condition: Box::new(bin(BinOp::Eq, var("n"), int("0"))),
                    body: Block::new(
                        vec![Node::ret(
                            Some(Node::new(NodeKind::BoolLit(base), at(1, 1))),
                            at(1, 1),
                        )],
                        at(1, 1),
                    ),
                    else_branch: None,
                }),
                at(1, 1),
            ),
            Node::ret(
                Some(Node::call(other, vec![bin(BinOp::Sub, var("n"), int("1"))], at(1, 1))),
                at(1, 1),
            ),
        ],
    )
}

#[test]
fn test_compile_and_optimize_program() {
    let root = Block::new(
        vec![
            fun(
                "add",
                &[("a", TypeTag::I32), ("b", TypeTag::I32)],
                Some(TypeTag::I32),
                vec![Node::ret(Some(bin(BinOp::Add, var("a"), var("b"))), at(1, 1))],
            ),
            Node::new(
                NodeKind::VarDecl(VarDecl {
                    name: "total".to_string(),
                    modifiers: vec![],
                    type_expr: Some(TypeNode::Primitive(TypeTag::I32)),
                    expr: Some(Box::new(Node::call(
                        "add",
                        vec![int("2"), int("3")],
                        at(2, 1),
                    ))),
                }),
                at(2, 1),
            ),
            Node::new(
                NodeKind::While(WhileNode {
                    condition: Box::new(bin(BinOp::Lt, var("total"), int("10"))),
                    body: Block::new(
                        vec![Node::new(
                            NodeKind::Assign(VarAssign {
                                target: Box::new(var("total")),
                                expr: Box::new(bin(BinOp::Add, var("total"), int("1"))),
                            }),
                            at(4, 5),
                        )],
                        at(3, 1),
                    ),
                }),
                at(3, 1),
            ),
        ],
        at(1, 1),
    );

    let context = Context::create();
    let options = CompileOptions::default().with_opt_level(OptLevel::O2);
    let mut compiler = Compiler::new(&context, options);

    compiler.compile(&root).unwrap();
    compiler.optimize().unwrap();

    assert_eq!(compiler.state(), PipelineState::Optimized);
    assert!(compiler.errors().is_empty());
    assert!(compiler.module.get_function("add").is_some());
    assert!(compiler.module.get_function("main").is_some());
    assert!(compiler.module.verify().is_ok());
}

#[test]
fn test_undeclared_variable_is_reported_with_position() {
    let root = Block::new(
        vec![Node::let_binding("y", Node::var("missing", at(3, 9)), at(3, 1))],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    let result = compiler.compile(&root);

    assert_eq!(result, Err(PipelineError::Aborted { errors: 1 }));
    assert_eq!(error_names(&compiler), vec!["VariableNotDeclared"]);
    assert_eq!(*compiler.errors()[0].get_position(), Position::new(3, 9));
    assert_eq!(compiler.state(), PipelineState::Empty);
}

#[test]
fn test_independent_errors_are_all_reported() {
    let root = Block::new(
        vec![
            Node::let_binding("a", Node::var("missing", at(1, 9)), at(1, 1)),
            Node::let_binding(
                "b",
                Node::binop(BinOp::Div, int("1"), int("0"), at(2, 11)),
                at(2, 1),
            ),
            Node::let_binding("c", int("3"), at(3, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert_eq!(
        compiler.compile(&root),
        Err(PipelineError::Aborted { errors: 2 })
    );
    assert_eq!(
        error_names(&compiler),
        vec!["VariableNotDeclared", "DivisionByZero"]
    );
    assert_eq!(compiler.errors()[1].get_position().row, 2);
}

#[test]
fn test_mutual_recursion_in_either_order() {
    for swap in [false, true] {
        let mut body = vec![
            parity("is_even", "is_odd", true),
            parity("is_odd", "is_even", false),
        ];
        if swap {
            body.reverse();
        }
        body.push(Node::let_binding(
            "r",
            Node::call("is_odd", vec![int("7")], at(9, 9)),
            at(9, 1),
        ));
        let root = Block::new(body, at(1, 1));

        let context = Context::create();
        let mut compiler = Compiler::new(&context, CompileOptions::default());

        compiler.compile(&root).unwrap();
        compiler.optimize().unwrap();

        for name in ["is_even", "is_odd"] {
            let function = compiler.module.get_function(name).unwrap();
            assert!(function.count_basic_blocks() > 0, "{} has no body", name);
        }
    }
}

#[test]
fn test_uncalled_functions_are_emitted_on_request() {
    let make_root = || {
        Block::new(
            vec![fun("unused", &[], None, vec![Node::let_binding("x", int("1"), at(1, 1))])],
            at(1, 1),
        )
    };

    let root = make_root();
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());
    compiler.compile(&root).unwrap();
    let unused = compiler.module.get_function("unused").unwrap();
    assert!(unused.count_basic_blocks() > 0);

    let root = make_root();
    let context = Context::create();
    let options = CompileOptions::default().with_emit_uncalled(false);
    let mut compiler = Compiler::new(&context, options);
    compiler.compile(&root).unwrap();
    assert!(compiler.module.get_function("unused").is_none());
    assert_eq!(compiler.functions.pending_count(), 1);
}

#[test]
fn test_scopes_are_balanced_after_compile() {
    let root = Block::new(
        vec![
            parity("is_even", "is_odd", true),
            parity("is_odd", "is_even", false),
            Node::new(
                NodeKind::Block(Block::new(
                    vec![Node::let_binding("inner", int("2"), at(2, 5))],
                    at(2, 1),
                )),
                at(2, 1),
            ),
            Node::let_binding("r", Node::call("is_even", vec![int("4")], at(3, 9)), at(3, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    compiler.compile(&root).unwrap();

    let (entered, exited) = compiler.scopes.counts();
    assert!(entered > 0);
    assert_eq!(entered, exited);
    assert_eq!(compiler.scopes.depth(), 0);
}

#[test]
fn test_prelude_functions_are_callable() {
    let prelude = IrSourcePrelude::new(
        "prelude",
        "define i32 @twice(i32 %x) {\nentry:\n  %r = mul i32 %x, 2\n  ret i32 %r\n}\n",
    );
    let root = Block::new(
        vec![Node::let_binding(
            "v",
            Node::call("twice", vec![int("21")], at(1, 9)),
            at(1, 1),
        )],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    compiler.merge_prelude(&prelude).unwrap();
    assert_eq!(compiler.state(), PipelineState::PreludeMerged);
    assert!(compiler.functions.is_defined("twice"));

    compiler.compile(&root).unwrap();
    compiler.optimize().unwrap();
    assert!(compiler.errors().is_empty());
}

#[test]
fn test_broken_prelude_aborts_the_unit() {
    let prelude = IrSourcePrelude::new("prelude", "this is not ir");
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert!(matches!(
        compiler.merge_prelude(&prelude),
        Err(PipelineError::Prelude(_))
    ));
    let root = Block::default();
    assert!(matches!(
        compiler.compile(&root),
        Err(PipelineError::Aborted { .. })
    ));
}

#[test]
fn test_stages_cannot_run_backwards() {
    let root = Block::default();
    let prelude = IrSourcePrelude::new("prelude", "");
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    compiler.compile(&root).unwrap();
    assert_eq!(
        compiler.merge_prelude(&prelude),
        Err(PipelineError::OutOfOrder {
            from: "user-code-compiled".to_string(),
            to: "prelude-merged".to_string(),
        })
    );
    assert_eq!(compiler.state(), PipelineState::UserCodeCompiled);
}

#[test]
fn test_data_record_fields() {
    let point = Node::new(
        NodeKind::DataDecl(DataDecl {
            name: "Point".to_string(),
            fields: vec![
                NamedVal::new("x", TypeNode::Primitive(TypeTag::I32), at(1, 1)),
                NamedVal::new("y", TypeNode::Primitive(TypeTag::I32), at(1, 1)),
            ],
        }),
        at(1, 1),
    );
    let make = Node::new(
        NodeKind::TypeCast {
            type_expr: TypeNode::named("Point"),
            expr: Box::new(Node::new(
                NodeKind::Tuple(TupleNode::new(vec![int("1"), int("2")])),
                at(2, 9),
            )),
        },
        at(2, 9),
    );
    let sum = bin(
        BinOp::Add,
        bin(BinOp::Member, var("p"), var("x")),
        bin(BinOp::Member, var("p"), var("y")),
    );
    let missing = Node::binop(BinOp::Member, var("p"), var("z"), at(4, 9));
    let root = Block::new(
        vec![
            Node::let_binding("p", make, at(2, 1)),
            Node::let_binding("s", sum, at(3, 1)),
            Node::let_binding("t", missing, at(4, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert!(compiler.compile(&root).is_err());
    assert_eq!(error_names(&compiler), vec!["UnknownField"]);
    assert!(compiler.data_types.contains_key("Point"));
}

#[test]
fn test_function_contract_errors() {
    let root = Block::new(
        vec![
            fun(
                "wrong",
                &[],
                Some(TypeTag::I32),
                vec![Node::ret(
                    Some(Node::new(NodeKind::StrLit("x".to_string()), at(2, 12))),
                    at(2, 5),
                )],
            ),
            fun("silent", &[], Some(TypeTag::I32), vec![]),
            fun("one", &[("a", TypeTag::I32)], None, vec![]),
            Node::call("one", vec![], at(5, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert!(compiler.compile(&root).is_err());

    // `one` is compiled by the call; the rest in declaration order afterwards.
    assert_eq!(
        error_names(&compiler),
        vec!["MissingArguments", "TypeMatchError", "MissingReturn"]
    );
}

#[test]
fn test_failed_return_value_reports_once() {
    let root = Block::new(
        vec![fun(
            "f",
            &[],
            Some(TypeTag::I32),
            vec![Node::ret(Some(Node::var("y", at(2, 12))), at(2, 5))],
        )],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert_eq!(
        compiler.compile(&root),
        Err(PipelineError::Aborted { errors: 1 })
    );
    assert_eq!(error_names(&compiler), vec!["VariableNotDeclared"]);
    assert_eq!(*compiler.errors()[0].get_position(), Position::new(2, 12));
}

#[test]
fn test_returning_reference_to_local_is_rejected() {
    let root = Block::new(
        vec![fun(
            "leak",
            &[],
            Some(TypeTag::I32),
            vec![
                var_decl(
                    "local",
                    Some(TypeNode::Primitive(TypeTag::I32)),
                    Some(int("1")),
                    at(2, 5),
                ),
                Node::ret(
                    Some(Node::new(NodeKind::RefVar("local".to_string()), at(3, 12))),
                    at(3, 5),
                ),
            ],
        )],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert!(compiler.compile(&root).is_err());
    assert_eq!(error_names(&compiler), vec!["EscapingReference"]);
    assert_eq!(compiler.errors()[0].get_position().row, 3);
}

#[test]
fn test_extension_methods_are_callable_by_mangled_name() {
    let twice = func_decl(
        "twice",
        &[("x", TypeTag::I32)],
        Some(TypeTag::I32),
        vec![Node::ret(Some(bin(BinOp::Mul, var("x"), int("2"))), at(2, 5))],
    );
    let root = Block::new(
        vec![
            Node::new(
                NodeKind::Ext(ExtNode {
                    type_expr: TypeNode::Primitive(TypeTag::I32),
                    methods: vec![twice],
                }),
                at(1, 1),
            ),
            Node::let_binding("v", Node::call("i32_twice", vec![int("4")], at(4, 9)), at(4, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    compiler.compile(&root).unwrap();
    compiler.optimize().unwrap();

    assert!(compiler.errors().is_empty());
    let method = compiler.module.get_function("i32_twice").unwrap();
    assert!(method.count_basic_blocks() > 0);
    assert!(compiler.module.get_function("twice").is_none());
}

#[test]
fn test_imports_are_recorded() {
    let root = Block::new(
        vec![
            Node::new(NodeKind::Import(Box::new(var("io"))), at(1, 1)),
            Node::new(
                NodeKind::Import(Box::new(Node::new(
                    NodeKind::StrLit("net".to_string()),
                    at(2, 8),
                ))),
                at(2, 1),
            ),
            Node::new(NodeKind::Import(Box::new(int("7"))), at(3, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert!(compiler.compile(&root).is_err());
    assert_eq!(compiler.imports, vec!["io", "net"]);
    assert_eq!(error_names(&compiler), vec!["InvalidImport"]);
    assert_eq!(compiler.errors()[0].get_position().row, 3);
}

#[test]
fn test_each_malformed_statement_reports_one_diagnostic() {
    let pair = Node::new(NodeKind::Array(vec![int("1"), int("2")]), at(2, 9));
    let cast = Node::new(
        NodeKind::TypeCast {
            type_expr: TypeNode::Primitive(TypeTag::Str),
            expr: Box::new(Node::float("1.5", TypeTag::F64, at(5, 13))),
        },
        at(5, 9),
    );
    let assign = Node::new(
        NodeKind::Assign(VarAssign {
            target: Box::new(int("3")),
            expr: Box::new(int("4")),
        }),
        at(7, 1),
    );
    let root = Block::new(
        vec![
            point_decl(),
            Node::let_binding("a", pair, at(2, 1)),
            Node::let_binding(
                "b",
                Node::binop(BinOp::Index, var("a"), int("5"), at(3, 9)),
                at(3, 1),
            ),
            Node::let_binding("e", Node::new(NodeKind::Array(vec![]), at(4, 9)), at(4, 1)),
            Node::let_binding("c", cast, at(5, 1)),
            var_decl("d", None, None, at(6, 1)),
            assign,
            Node::call("nowhere", vec![], at(8, 1)),
            point_decl(),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert_eq!(
        compiler.compile(&root),
        Err(PipelineError::Aborted { errors: 7 })
    );
    // Declarations are hoisted, so the duplicate type comes first.
    assert_eq!(
        error_names(&compiler),
        vec![
            "TypeAlreadyDeclared",
            "IndexOutOfBounds",
            "EmptyArrayLiteral",
            "InvalidCast",
            "ExpectedExplicitValue",
            "InvalidAssignTarget",
            "FunctionNotDeclared",
        ]
    );
    let rows: Vec<u32> = compiler
        .errors()
        .iter()
        .map(|error| error.get_position().row)
        .collect();
    assert_eq!(rows, vec![1, 3, 4, 5, 6, 7, 8]);
}

/// `fun sign(n: i32) -> i32 { if n < 0 { return -1; } else if n == 0 { return 0; } else { return 1; } }`
#[test]
fn test_else_if_chain_codegen() {
    let ret = |value: &str| {
        Block::new(
            vec![Node::ret(Some(Node::int(value, TypeTag::I32, at(1, 1))), at(1, 1))],
            at(1, 1),
        )
    };
    let chain = IfNode {
        condition: Box::new(bin(BinOp::Lt, var("n"), int("0"))),
        body: ret("-1"),
        else_branch: Some(ElseBranch::If(Box::new(IfNode {
            condition: Box::new(bin(BinOp::Eq, var("n"), int("0"))),
            body: ret("0"),
            else_branch: Some(ElseBranch::Block(ret("1"))),
        }))),
    };
    let root = Block::new(
        vec![
            fun(
                "sign",
                &[("n", TypeTag::I32)],
                Some(TypeTag::I32),
                vec![Node::new(NodeKind::If(chain), at(2, 5))],
            ),
            Node::let_binding("s", Node::call("sign", vec![int("-4")], at(3, 9)), at(3, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    compiler.compile(&root).unwrap();
    assert!(compiler.errors().is_empty());
    assert!(compiler.module.verify().is_ok());

    let sign = compiler.module.get_function("sign").unwrap();
    let blocks = sign.count_basic_blocks();
    compiler.optimize().unwrap();
    assert!(blocks >= 6, "expected a block per arm, got {}", blocks);
}

#[test]
fn test_scopes_are_balanced_after_failed_walk() {
    let arm = Node::new(
        NodeKind::ExprIf(ExprIfNode {
            condition: Box::new(Node::new(NodeKind::BoolLit(true), at(1, 12))),
            then_branch: Box::new(block_node(vec![Node::var("missing", at(1, 20))])),
            else_branch: Box::new(block_node(vec![int("1")])),
        }),
        at(1, 9),
    );
    let root = Block::new(
        vec![
            Node::let_binding("v", arm, at(1, 1)),
            fun(
                "broken",
                &[],
                None,
                vec![Node::let_binding("q", Node::var("absent", at(2, 13)), at(2, 5))],
            ),
            Node::call("broken", vec![], at(3, 1)),
            Node::new(
                NodeKind::While(WhileNode {
                    condition: Box::new(Node::var("nothing", at(4, 7))),
                    body: Block::new(vec![Node::let_binding("w", int("1"), at(4, 20))], at(4, 1)),
                }),
                at(4, 1),
            ),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    assert_eq!(
        compiler.compile(&root),
        Err(PipelineError::Aborted { errors: 3 })
    );
    let rows: Vec<u32> = compiler
        .errors()
        .iter()
        .map(|error| error.get_position().row)
        .collect();
    assert_eq!(rows, vec![1, 2, 4]);
    assert!(error_names(&compiler).iter().all(|name| name == "VariableNotDeclared"));

    let (entered, exited) = compiler.scopes.counts();
    assert!(entered > 0);
    assert_eq!(entered, exited);
    assert_eq!(compiler.scopes.depth(), 0);
}

#[test]
fn test_shadowed_binding_is_restored_after_block() {
    let root = Block::new(
        vec![
            fun(
                "pick",
                &[],
                Some(TypeTag::I32),
                vec![
                    Node::let_binding("x", int("1"), at(2, 5)),
                    block_node(vec![Node::let_binding(
                        "x",
                        Node::new(NodeKind::BoolLit(false), at(3, 17)),
                        at(3, 9),
                    )]),
                    Node::ret(Some(var("x")), at(4, 5)),
                ],
            ),
            Node::let_binding("r", Node::call("pick", vec![], at(6, 9)), at(6, 1)),
        ],
        at(1, 1),
    );
    let context = Context::create();
    let mut compiler = Compiler::new(&context, CompileOptions::default());

    compiler.compile(&root).unwrap();

    assert!(compiler.errors().is_empty());
    let pick = compiler.module.get_function("pick").unwrap();
    assert_eq!(
        pick.get_type().get_return_type(),
        Some(context.i32_type().into())
    );
    assert!(pick.print_to_string().to_string().contains("ret i32 1"));
}

#[test]
fn test_compile_file_with_parser_closure() {
    let parser = |_: &Path| -> Result<Block, ParseError> {
        Ok(Block::new(
            vec![Node::let_binding("x", int("1"), at(1, 1))],
            at(1, 1),
        ))
    };
    let context = Context::create();

    let artifacts = compile_file(
        &context,
        &parser,
        &PathBuf::from("unit.an"),
        None,
        CompileOptions::default().with_module_name("unit"),
    )
    .unwrap();

    assert!(artifacts.ir.contains("define i32 @main()"));
    assert!(artifacts.object.is_none());
    assert!(artifacts.executable.is_none());
}

#[test]
fn test_compile_file_reports_parse_errors() {
    let parser = |_: &Path| -> Result<Block, ParseError> {
        Err(ParseError::new(ParseErr::Expected, "`;`", Position::new(2, 7)).with_token("}"))
    };
    let context = Context::create();

    let failure = compile_file(
        &context,
        &parser,
        &PathBuf::from("broken.an"),
        None,
        CompileOptions::default(),
    )
    .unwrap_err();

    assert_eq!(failure.cause, PipelineError::Aborted { errors: 1 });
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(failure.errors[0].get_error_name(), "ParseError");
    assert_eq!(*failure.errors[0].get_position(), Position::new(2, 7));
}

#[test]
fn test_emit_ir_writes_the_module() {
    let path = std::env::temp_dir().join("antec_emit_ir_test.ll");
    let _ = std::fs::remove_file(&path);
    let root = Block::new(vec![Node::let_binding("x", int("5"), at(1, 1))], at(1, 1));
    let context = Context::create();
    let options = CompileOptions::default().with_emit_ir(path.clone());
    let mut compiler = Compiler::new(&context, options);

    compiler.compile(&root).unwrap();
    compiler.optimize().unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("@main"));
    let _ = std::fs::remove_file(&path);
}
