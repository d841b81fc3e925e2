use inkwell::{
    basic_block::BasicBlock,
    types::BasicTypeEnum,
    values::BasicValueEnum,
};
use log::debug;

use crate::{
    ast::{
        ast::{Block, Node, NodeKind},
        expressions::UnOp,
        statements::{ElseBranch, IfNode, LetBinding, VarAssign, VarDecl, WhileNode},
        types::{Modifier, TypeTag},
    },
    errors::errors::ErrorImpl,
};

use super::{
    compiler::Compiler,
    expr::{compile_condition, gen_expression},
    scope::Variable,
    types::{CompileResult, Type, TypedValue},
};

/// Compiles any node at the builder's current position.
///
/// Failures are recorded on the compiler against the node's span and an
/// error value is returned; the caller decides whether to keep going.
pub fn gen_statement<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    node: &'ast Node,
) -> TypedValue<'ctx> {
    let result = match &node.kind {
        NodeKind::Let(binding) => gen_let(compiler, binding),
        NodeKind::VarDecl(decl) => gen_var_decl(compiler, decl),
        NodeKind::Assign(assign) => gen_assign(compiler, assign),
        NodeKind::If(if_node) => gen_if(compiler, if_node),
        NodeKind::While(while_node) => gen_while(compiler, while_node),
        NodeKind::Return(expr) => gen_return(compiler, expr.as_deref()),
        NodeKind::Block(block) => Ok(gen_scoped_block(compiler, block)),
        // Hoisted when the enclosing block was entered.
        NodeKind::FuncDecl(_) | NodeKind::DataDecl(_) | NodeKind::Ext(_) => {
            Ok(TypedValue::void())
        }
        NodeKind::Import(expr) => gen_import(compiler, expr),
        NodeKind::Mod(_) => Ok(TypedValue::void()),
        _ => gen_expression(compiler, node),
    };

    compiler.finish(result, &node.span)
}

/// Compiles `block` inside a fresh scope frame.
pub(crate) fn gen_scoped_block<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    block: &'ast Block,
) -> TypedValue<'ctx> {
    compiler.scopes.enter_scope();
    let value = compiler.compile_block_body(block);
    compiler.scopes.exit_scope();
    value
}

fn zero_value(ty: BasicTypeEnum) -> BasicValueEnum {
    match ty {
        BasicTypeEnum::IntType(int) => int.const_zero().into(),
        BasicTypeEnum::FloatType(float) => float.const_zero().into(),
        BasicTypeEnum::PointerType(ptr) => ptr.const_null().into(),
        BasicTypeEnum::ArrayType(array) => array.const_zero().into(),
        BasicTypeEnum::StructType(structure) => structure.const_zero().into(),
        BasicTypeEnum::VectorType(vector) => vector.const_zero().into(),
    }
}

fn already_declared(compiler: &Compiler, name: &str) -> CompileResult<'static, ()> {
    if compiler.scopes.is_bound_in_current(name) {
        return Err(ErrorImpl::VariableAlreadyDeclared {
            variable: name.to_string(),
        }
        .into());
    }
    Ok(())
}

fn gen_let<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    binding: &'ast LetBinding,
) -> CompileResult<'ctx> {
    already_declared(compiler, &binding.name)?;

    let value = binding.expr.compile(compiler).checked()?;
    let value = match &binding.type_expr {
        Some(type_expr) => {
            let ty = compiler.resolve_type(type_expr)?;
            compiler.coerce(value, &ty)?
        }
        None => value,
    };

    let raw = value.basic()?;
    compiler
        .scopes
        .bind(&binding.name, Variable::immutable(raw, value.ty));
    Ok(TypedValue::void())
}

fn gen_var_decl<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    decl: &'ast VarDecl,
) -> CompileResult<'ctx> {
    already_declared(compiler, &decl.name)?;

    let explicit = decl
        .type_expr
        .as_ref()
        .map(|type_expr| compiler.resolve_type(type_expr))
        .transpose()?;
    let init = match &decl.expr {
        Some(expr) => Some(expr.compile(compiler).checked()?),
        None => None,
    };

    let (ty, init) = match (explicit, init) {
        (Some(ty), Some(value)) => {
            let value = compiler.coerce(value, &ty)?;
            (ty, Some(value))
        }
        (Some(ty), None) => (ty, None),
        (None, Some(value)) => (value.ty.clone(), Some(value)),
        (None, None) => return Err(ErrorImpl::ExpectedExplicitValue.into()),
    };

    let llvm_type = compiler.llvm_type(&ty)?;
    let slot = compiler.builder.build_alloca(llvm_type, &decl.name)?;
    match init {
        Some(value) => {
            compiler.builder.build_store(slot, value.basic()?)?;
        }
        None if !decl.modifiers.contains(&Modifier::Noinit) => {
            compiler.builder.build_store(slot, zero_value(llvm_type))?;
        }
        None => {}
    }

    compiler
        .scopes
        .bind(&decl.name, Variable::mutable(slot.into(), ty));
    Ok(TypedValue::void())
}

/// Stores into a mutable variable or through a pointer.
fn gen_assign<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    assign: &'ast VarAssign,
) -> CompileResult<'ctx> {
    let (slot, ty) = match &assign.target.kind {
        NodeKind::Var(name) => {
            let variable = compiler.scopes.lookup(name)?.clone();
            if !variable.mutable {
                return Err(ErrorImpl::ImmutableAssignment {
                    variable: name.clone(),
                }
                .into());
            }
            (variable.value.into_pointer_value(), variable.ty)
        }
        NodeKind::UnOp {
            op: UnOp::Deref,
            expr,
        } => {
            let pointer = expr.compile(compiler).checked()?;
            let pointee = match &pointer.ty {
                Type::Ptr(inner) if !inner.is_void() => (**inner).clone(),
                Type::Prim(TypeTag::Str) => Type::Prim(TypeTag::C8),
                other => {
                    return Err(ErrorImpl::TypeMatchError {
                        expected: "a pointer".to_string(),
                        received: other.to_string(),
                    }
                    .into())
                }
            };
            (pointer.basic()?.into_pointer_value(), pointee)
        }
        _ => return Err(ErrorImpl::InvalidAssignTarget.into()),
    };

    let value = assign.expr.compile(compiler).checked()?;
    let value = compiler.coerce(value, &ty)?;
    compiler.builder.build_store(slot, value.basic()?)?;
    Ok(TypedValue::void())
}

/// Branches to `target` unless the current block is already terminated.
fn close_to<'ctx>(compiler: &Compiler<'ctx, '_>, target: BasicBlock<'ctx>) -> CompileResult<'ctx, ()> {
    if let Some(block) = compiler.builder.get_insert_block() {
        if block.get_terminator().is_none() {
            compiler.builder.build_unconditional_branch(target)?;
        }
    }
    Ok(())
}

fn in_dead_block(compiler: &Compiler) -> bool {
    compiler
        .builder
        .get_insert_block()
        .is_some_and(|block| compiler.is_dead(block))
}

/// Compiles an if statement and its else-if chain.
///
/// The join block is only reachable if some branch falls through; otherwise
/// it is marked dead so no return is demanded after it.
fn gen_if<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    if_node: &'ast IfNode,
) -> CompileResult<'ctx> {
    let was_dead = in_dead_block(compiler);
    let condition = compile_condition(compiler, &if_node.condition)?;
    let function = compiler.current_function()?;

    let then_bb = compiler.context.append_basic_block(function, "then");
    let else_bb = match if_node.else_branch {
        Some(_) => Some(compiler.context.append_basic_block(function, "else")),
        None => None,
    };
    let end_bb = compiler.context.append_basic_block(function, "endif");
    compiler
        .builder
        .build_conditional_branch(condition, then_bb, else_bb.unwrap_or(end_bb))?;

    compiler.builder.position_at_end(then_bb);
    gen_scoped_block(compiler, &if_node.body);
    let then_falls = compiler.falls_through();
    close_to(compiler, end_bb)?;

    let else_falls = match (&if_node.else_branch, else_bb) {
        (Some(ElseBranch::If(nested)), Some(block)) => {
            compiler.builder.position_at_end(block);
            if let Err(bail) = gen_if(compiler, nested) {
                compiler.reported(bail, &nested.condition.span);
            }
            let falls = compiler.falls_through();
            close_to(compiler, end_bb)?;
            falls
        }
        (Some(ElseBranch::Block(body)), Some(block)) => {
            compiler.builder.position_at_end(block);
            gen_scoped_block(compiler, body);
            let falls = compiler.falls_through();
            close_to(compiler, end_bb)?;
            falls
        }
        _ => true,
    };

    compiler.builder.position_at_end(end_bb);
    if was_dead || (!then_falls && !else_falls) {
        compiler.dead_blocks.push(end_bb);
    }
    Ok(TypedValue::void())
}

fn gen_while<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    while_node: &'ast WhileNode,
) -> CompileResult<'ctx> {
    let was_dead = in_dead_block(compiler);
    let function = compiler.current_function()?;

    let cond_bb = compiler.context.append_basic_block(function, "while_cond");
    compiler.builder.build_unconditional_branch(cond_bb)?;
    compiler.builder.position_at_end(cond_bb);

    let condition = match compile_condition(compiler, &while_node.condition) {
        Ok(condition) => condition,
        Err(bail) => {
            let end_bb = compiler.context.append_basic_block(function, "endwhile");
            compiler.builder.build_unconditional_branch(end_bb)?;
            compiler.builder.position_at_end(end_bb);
            return Err(bail);
        }
    };

    let body_bb = compiler.context.append_basic_block(function, "while");
    let end_bb = compiler.context.append_basic_block(function, "endwhile");
    compiler
        .builder
        .build_conditional_branch(condition, body_bb, end_bb)?;

    compiler.builder.position_at_end(body_bb);
    gen_scoped_block(compiler, &while_node.body);
    close_to(compiler, cond_bb)?;

    compiler.builder.position_at_end(end_bb);
    if was_dead {
        compiler.dead_blocks.push(end_bb);
    }
    Ok(TypedValue::void())
}

/// Returns from the current function. Code that follows lands in a dead block,
/// including when the returned value fails to compile.
fn gen_return<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    expr: Option<&'ast Node>,
) -> CompileResult<'ctx> {
    let function = compiler.current_function()?;
    let emitted = emit_return(compiler, expr);

    if emitted.is_err() {
        let open = compiler
            .builder
            .get_insert_block()
            .is_some_and(|block| block.get_terminator().is_none());
        if open {
            compiler.builder.build_unreachable()?;
        }
    }

    let after = compiler.context.append_basic_block(function, "after_return");
    compiler.builder.position_at_end(after);
    compiler.dead_blocks.push(after);
    emitted?;
    Ok(TypedValue::void())
}

fn emit_return<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    expr: Option<&'ast Node>,
) -> CompileResult<'ctx, ()> {
    let ret = compiler
        .current_fn
        .as_ref()
        .map(|current| current.ret.clone())
        .unwrap_or(Type::VOID);

    match expr {
        Some(expr) => {
            if let NodeKind::RefVar(name) = &expr.kind {
                // Every visible binding belongs to this function's frames.
                if compiler.scopes.lookup(name).is_ok() {
                    return Err(ErrorImpl::EscapingReference {
                        variable: name.clone(),
                    }
                    .into());
                }
            }

            let value = expr.compile(compiler).checked()?;
            let value = compiler.coerce(value, &ret)?;
            match value.value {
                Some(raw) => compiler.builder.build_return(Some(&raw))?,
                None => compiler.builder.build_return(None)?,
            };
        }
        None if ret.is_void() => {
            compiler.builder.build_return(None)?;
        }
        None => {
            return Err(ErrorImpl::TypeMatchError {
                expected: ret.to_string(),
                received: Type::VOID.to_string(),
            }
            .into())
        }
    }
    Ok(())
}

/// Records the module named by an import for the driver to load.
fn gen_import<'ctx>(compiler: &mut Compiler<'ctx, '_>, expr: &Node) -> CompileResult<'ctx> {
    match &expr.kind {
        NodeKind::Var(module) | NodeKind::StrLit(module) => {
            debug!("import `{}`", module);
            compiler.imports.push(module.clone());
            Ok(TypedValue::void())
        }
        _ => Err(ErrorImpl::InvalidImport.into()),
    }
}
