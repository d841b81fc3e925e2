use inkwell::{
    types::BasicType,
    values::{BasicMetadataValueEnum, BasicValue, BasicValueEnum, IntValue},
};
use log::trace;

use crate::{
    ast::{
        ast::{Node, NodeKind},
        expressions::{BinOp, BinOpNode, CallNode, ExprIfNode, TupleNode, UnOp},
        types::TypeTag,
    },
    errors::errors::ErrorImpl,
};

use super::{
    compiler::Compiler,
    ops::{const_int_value, int_fits},
    stmt::gen_statement,
    types::{Bail, CompileResult, Type, TypedValue},
};

/// Generates LLVM IR for an expression node.
pub fn gen_expression<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    node: &'ast Node,
) -> CompileResult<'ctx> {
    match &node.kind {
        NodeKind::IntLit { value, type_tag } => gen_int_literal(compiler, value, *type_tag),
        NodeKind::FltLit { value, type_tag } => gen_float_literal(compiler, value, *type_tag),
        NodeKind::BoolLit(value) => Ok(TypedValue::new(
            compiler
                .context
                .bool_type()
                .const_int(u64::from(*value), false)
                .into(),
            Type::BOOL,
        )),
        NodeKind::StrLit(value) => {
            let global = compiler.builder.build_global_string_ptr(value, "str")?;
            Ok(TypedValue::new(
                global.as_pointer_value().into(),
                Type::STR,
            ))
        }
        NodeKind::Array(elements) => gen_array(compiler, elements),
        NodeKind::Tuple(tuple) => gen_tuple(compiler, tuple),
        NodeKind::TypeCast { type_expr, expr } => {
            let target = compiler.resolve_type(type_expr)?;
            let value = expr.compile(compiler).checked()?;
            compiler.cast(value, &target)
        }
        NodeKind::UnOp { op, expr } => gen_unop(compiler, *op, expr),
        NodeKind::BinOp(binop) => gen_binop(compiler, binop, node),
        NodeKind::Var(name) => gen_var(compiler, name),
        NodeKind::RefVar(name) => gen_ref_var(compiler, name),
        NodeKind::ExprIf(if_expr) => gen_expr_if(compiler, if_expr),
        NodeKind::Call(call) => gen_call(compiler, call, node),
        _ => gen_statement(compiler, node).checked(),
    }
}

/// Parses integer literal text: `_` separators, an optional leading `-`,
/// and `0x` / `0o` / `0b` prefixes.
pub fn parse_int_literal(text: &str) -> Option<i128> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    let (radix, digits) = if let Some(hex) = digits.strip_prefix("0x") {
        (16, hex)
    } else if let Some(octal) = digits.strip_prefix("0o") {
        (8, octal)
    } else if let Some(binary) = digits.strip_prefix("0b") {
        (2, binary)
    } else {
        (10, digits)
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn gen_int_literal<'ctx>(
    compiler: &Compiler<'ctx, '_>,
    text: &str,
    tag: TypeTag,
) -> CompileResult<'ctx> {
    let parse_error = || ErrorImpl::NumberParseError {
        token: text.to_string(),
    };
    let value = parse_int_literal(text).ok_or_else(parse_error)?;

    if tag.is_float() {
        let float_type = compiler.llvm_type(&Type::Prim(tag))?.into_float_type();
        return Ok(TypedValue::new(
            float_type.const_float(value as f64).into(),
            Type::Prim(tag),
        ));
    }

    let width = tag.int_width().ok_or_else(parse_error)?;
    if !int_fits(value, width, tag.is_signed()) {
        return Err(ErrorImpl::IntegerOverflow {
            value: text.to_string(),
            type_: tag.to_string(),
        }
        .into());
    }

    let int_type = compiler.context.custom_width_int_type(width);
    Ok(TypedValue::new(
        int_type.const_int(value as u64, tag.is_signed()).into(),
        Type::Prim(tag),
    ))
}

fn gen_float_literal<'ctx>(
    compiler: &Compiler<'ctx, '_>,
    text: &str,
    tag: TypeTag,
) -> CompileResult<'ctx> {
    let parse_error = || ErrorImpl::NumberParseError {
        token: text.to_string(),
    };
    if !tag.is_float() {
        return Err(parse_error().into());
    }

    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let value: f64 = cleaned.parse().map_err(|_| parse_error())?;
    let float_type = compiler.llvm_type(&Type::Prim(tag))?.into_float_type();
    Ok(TypedValue::new(
        float_type.const_float(value).into(),
        Type::Prim(tag),
    ))
}

/// Compiles every element, reporting each failure, and fails afterwards if any did.
fn compile_all<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    nodes: &'ast [Node],
) -> CompileResult<'ctx, Vec<TypedValue<'ctx>>> {
    let values: Vec<TypedValue<'ctx>> =
        nodes.iter().map(|node| node.compile(compiler)).collect();
    if values.iter().any(TypedValue::is_err) {
        return Err(Bail::Reported);
    }
    Ok(values)
}

fn gen_array<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    elements: &'ast [Node],
) -> CompileResult<'ctx> {
    let values = compile_all(compiler, elements)?;
    let Some(first) = values.first() else {
        return Err(ErrorImpl::EmptyArrayLiteral.into());
    };
    let element_ty = first.ty.clone();

    let mut coerced = Vec::with_capacity(values.len());
    let mut failed = false;
    for (value, node) in values.into_iter().zip(elements.iter()) {
        match compiler.coerce(value, &element_ty) {
            Ok(value) => coerced.push(value),
            Err(bail) => {
                compiler.reported(bail, &node.span);
                failed = true;
            }
        }
    }
    if failed {
        return Err(Bail::Reported);
    }

    let array_type = compiler
        .llvm_type(&element_ty)?
        .array_type(coerced.len() as u32);
    let mut array = array_type.get_undef();
    for (index, value) in coerced.iter().enumerate() {
        array = compiler
            .builder
            .build_insert_value(array, value.basic()?, index as u32, "elem")?
            .into_array_value();
    }

    Ok(TypedValue::new(
        array.as_basic_value_enum(),
        Type::Array(Box::new(element_ty), coerced.len() as u32),
    ))
}

/// Compiles the elements of a tuple as separate values.
pub fn unpack<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    tuple: &'ast TupleNode,
) -> CompileResult<'ctx, Vec<TypedValue<'ctx>>> {
    compile_all(compiler, &tuple.elements)
}

/// An empty tuple is void and a one-element tuple is its element.
fn gen_tuple<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    tuple: &'ast TupleNode,
) -> CompileResult<'ctx> {
    let mut values = unpack(compiler, tuple)?;
    match values.len() {
        0 => return Ok(TypedValue::void()),
        1 => return Ok(values.remove(0)),
        _ => {}
    }

    let raw = values
        .iter()
        .map(TypedValue::basic)
        .collect::<CompileResult<'ctx, Vec<BasicValueEnum<'ctx>>>>()?;
    let field_types: Vec<_> = raw.iter().map(|value| value.get_type()).collect();
    let mut record = compiler.context.struct_type(&field_types, false).get_undef();
    for (index, value) in raw.into_iter().enumerate() {
        record = compiler
            .builder
            .build_insert_value(record, value, index as u32, "elem")?
            .into_struct_value();
    }

    Ok(TypedValue::new(
        record.as_basic_value_enum(),
        Type::Tuple(values.into_iter().map(|value| value.ty).collect()),
    ))
}

fn unsupported_unop(op: UnOp, ty: &Type) -> Bail {
    Bail::Error(ErrorImpl::UnsupportedOperator {
        operator: op.to_string(),
        type_: ty.to_string(),
    })
}

fn gen_unop<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    op: UnOp,
    expr: &'ast Node,
) -> CompileResult<'ctx> {
    let value = expr.compile(compiler).checked()?;
    let raw = value.basic()?;

    match op {
        UnOp::Neg if value.ty.is_integer() => {
            let negated = compiler.builder.build_int_neg(raw.into_int_value(), "neg")?;
            Ok(TypedValue::new(negated.into(), value.ty))
        }
        UnOp::Neg if value.ty.is_float() => {
            let negated = compiler
                .builder
                .build_float_neg(raw.into_float_value(), "fneg")?;
            Ok(TypedValue::new(negated.into(), value.ty))
        }
        UnOp::Not if value.ty.is_integer() || value.ty == Type::BOOL => {
            let inverted = compiler.builder.build_not(raw.into_int_value(), "not")?;
            Ok(TypedValue::new(inverted.into(), value.ty))
        }
        UnOp::Deref => {
            let pointee = match &value.ty {
                Type::Ptr(inner) if !inner.is_void() => (**inner).clone(),
                Type::Prim(TypeTag::Str) => Type::Prim(TypeTag::C8),
                other => return Err(unsupported_unop(op, other)),
            };
            let loaded = compiler
                .builder
                .build_load(raw.into_pointer_value(), "deref")?;
            Ok(TypedValue::new(loaded, pointee))
        }
        _ => Err(unsupported_unop(op, &value.ty)),
    }
}

fn gen_binop<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    binop: &'ast BinOpNode,
    node: &'ast Node,
) -> CompileResult<'ctx> {
    if binop.op == BinOp::Member {
        return gen_member(compiler, binop);
    }

    // Both sides are compiled before either is checked so each reports its own errors.
    let lhs = binop.lhs.compile(compiler);
    let rhs = binop.rhs.compile(compiler);
    let (lhs, rhs) = (lhs.checked()?, rhs.checked()?);

    match binop.op {
        BinOp::Index => return gen_index(compiler, &lhs, &rhs),
        BinOp::And | BinOp::Or => return compiler.comp_logic(binop.op, &lhs, &rhs),
        BinOp::Add | BinOp::Sub if lhs.ty.is_pointer() && rhs.ty.is_integer() => {
            return compiler.comp_ptr_offset(&lhs, &rhs, binop.op == BinOp::Sub);
        }
        _ => {}
    }

    let (ty, l, r) = compiler.reconcile(&lhs, &rhs)?;
    match binop.op {
        BinOp::Add => compiler.comp_add(&ty, l, r, node).checked(),
        BinOp::Sub => compiler.comp_sub(&ty, l, r, node).checked(),
        BinOp::Mul => compiler.comp_mul(&ty, l, r, node).checked(),
        BinOp::Div => compiler.comp_div(&ty, l, r, node).checked(),
        BinOp::Rem => compiler.comp_rem(&ty, l, r, node).checked(),
        op => compiler.comp_cmp(op, &ty, l, r),
    }
}

fn gen_index<'ctx>(
    compiler: &Compiler<'ctx, '_>,
    lhs: &TypedValue<'ctx>,
    rhs: &TypedValue<'ctx>,
) -> CompileResult<'ctx> {
    if !rhs.ty.is_integer() {
        return Err(ErrorImpl::TypeMatchError {
            expected: "an integer index".to_string(),
            received: rhs.ty.to_string(),
        }
        .into());
    }
    let index = rhs.basic()?.into_int_value();
    let constant = const_int_value(index, &rhs.ty);
    let check_bounds = |len: u64| -> CompileResult<'ctx, Option<u32>> {
        match constant {
            Some(i) if i < 0 || i as u64 >= len => Err(ErrorImpl::IndexOutOfBounds {
                index: i as u64,
                len,
            }
            .into()),
            Some(i) => Ok(Some(i as u32)),
            None => Ok(None),
        }
    };

    match &lhs.ty {
        Type::Array(element, len) => {
            let array = lhs.basic()?.into_array_value();
            if let Some(i) = check_bounds(u64::from(*len))? {
                let value = compiler.builder.build_extract_value(array, i, "elem")?;
                return Ok(TypedValue::new(value, (**element).clone()));
            }

            let slot = compiler.builder.build_alloca(array.get_type(), "array")?;
            compiler.builder.build_store(slot, array)?;
            let zero = compiler.context.i64_type().const_zero();
            let index = compiler.resize_int(index, &rhs.ty, 64)?;
            let element_ptr = unsafe {
                compiler
                    .builder
                    .build_in_bounds_gep(slot, &[zero, index], "elem_ptr")?
            };
            let value = compiler.builder.build_load(element_ptr, "elem")?;
            Ok(TypedValue::new(value, (**element).clone()))
        }
        Type::Tuple(elements) => {
            let i = check_bounds(elements.len() as u64)?.ok_or_else(|| {
                ErrorImpl::TypeMatchError {
                    expected: "a constant index".to_string(),
                    received: rhs.ty.to_string(),
                }
            })?;
            let tuple = lhs.basic()?.into_struct_value();
            let value = compiler.builder.build_extract_value(tuple, i, "elem")?;
            Ok(TypedValue::new(value, elements[i as usize].clone()))
        }
        Type::Ptr(element) if !element.is_void() => {
            load_offset(compiler, lhs, rhs, (**element).clone())
        }
        Type::Prim(TypeTag::Str) => load_offset(compiler, lhs, rhs, Type::Prim(TypeTag::C8)),
        other => Err(ErrorImpl::UnsupportedOperator {
            operator: BinOp::Index.to_string(),
            type_: other.to_string(),
        }
        .into()),
    }
}

fn load_offset<'ctx>(
    compiler: &Compiler<'ctx, '_>,
    ptr: &TypedValue<'ctx>,
    offset: &TypedValue<'ctx>,
    element: Type,
) -> CompileResult<'ctx> {
    let moved = compiler.comp_ptr_offset(ptr, offset, false)?;
    let value = compiler
        .builder
        .build_load(moved.basic()?.into_pointer_value(), "elem")?;
    Ok(TypedValue::new(value, element))
}

/// Reads a field of a record, or of a record behind a pointer.
fn gen_member<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    binop: &'ast BinOpNode,
) -> CompileResult<'ctx> {
    let record = binop.lhs.compile(compiler).checked()?;
    let unknown_field = |field: String| {
        Bail::Error(ErrorImpl::UnknownField {
            field,
            type_: record.ty.to_string(),
        })
    };

    let NodeKind::Var(field) = &binop.rhs.kind else {
        return Err(unknown_field(binop.rhs.to_string()));
    };

    let (value, name) = match &record.ty {
        Type::Data(name) => (record.basic()?.into_struct_value(), name.clone()),
        Type::Ptr(inner) => match &**inner {
            Type::Data(name) => {
                let loaded = compiler
                    .builder
                    .build_load(record.basic()?.into_pointer_value(), "record")?;
                (loaded.into_struct_value(), name.clone())
            }
            _ => return Err(unknown_field(field.clone())),
        },
        _ => return Err(unknown_field(field.clone())),
    };

    let data = compiler
        .data_types
        .get(&name)
        .ok_or_else(|| ErrorImpl::UnknownType { type_: name.clone() })?;
    let (index, ty) = data
        .field_index(field)
        .ok_or_else(|| unknown_field(field.clone()))?;
    let ty = ty.clone();

    let extracted = compiler.builder.build_extract_value(value, index, field)?;
    Ok(TypedValue::new(extracted, ty))
}

fn gen_var<'ctx>(compiler: &mut Compiler<'ctx, '_>, name: &str) -> CompileResult<'ctx> {
    let variable = match compiler.scopes.lookup(name) {
        Ok(variable) => variable.clone(),
        Err(err) => {
            // A function name used as a value.
            if compiler.functions.contains(name) {
                let entry = compiler.resolve_function(name)?;
                return Ok(TypedValue::new(
                    entry.value.as_global_value().as_pointer_value().into(),
                    Type::Function(Box::new(entry.sig)),
                ));
            }
            return Err(err.into());
        }
    };

    if variable.mutable {
        let loaded = compiler
            .builder
            .build_load(variable.value.into_pointer_value(), name)?;
        Ok(TypedValue::new(loaded, variable.ty))
    } else {
        Ok(TypedValue::new(variable.value, variable.ty))
    }
}

fn gen_ref_var<'ctx>(compiler: &Compiler<'ctx, '_>, name: &str) -> CompileResult<'ctx> {
    let variable = compiler.scopes.lookup(name)?;
    if !variable.mutable {
        return Err(ErrorImpl::NotAddressable {
            variable: name.to_string(),
        }
        .into());
    }
    Ok(TypedValue::new(
        variable.value,
        Type::ptr(variable.ty.clone()),
    ))
}

/// The type both arms of an if-expression convert to, if any.
fn unify(then_ty: &Type, else_ty: &Type) -> Option<Type> {
    if then_ty == else_ty {
        return Some(then_ty.clone());
    }

    let wider = |a: Option<u32>, b: Option<u32>| {
        if a >= b {
            then_ty.clone()
        } else {
            else_ty.clone()
        }
    };
    if then_ty.is_integer() && else_ty.is_integer() && then_ty.is_signed() == else_ty.is_signed()
    {
        return Some(wider(then_ty.int_width(), else_ty.int_width()));
    }
    if then_ty.is_float() && else_ty.is_float() {
        return Some(wider(then_ty.float_width(), else_ty.float_width()));
    }
    None
}

/// Compiles an if-expression. Both arms are required and must unify to one type.
fn gen_expr_if<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    if_expr: &'ast ExprIfNode,
) -> CompileResult<'ctx> {
    let condition = compile_condition(compiler, &if_expr.condition)?;
    let function = compiler.current_function()?;

    let then_bb = compiler.context.append_basic_block(function, "then");
    let else_bb = compiler.context.append_basic_block(function, "else");
    let merge_bb = compiler.context.append_basic_block(function, "endif");
    compiler
        .builder
        .build_conditional_branch(condition, then_bb, else_bb)?;

    let mut arms = Vec::with_capacity(2);
    for (block, branch) in [(then_bb, &if_expr.then_branch), (else_bb, &if_expr.else_branch)] {
        compiler.builder.position_at_end(block);
        compiler.scopes.enter_scope();
        let value = branch.compile(compiler);
        compiler.scopes.exit_scope();

        let falls = compiler.falls_through();
        let end = compiler.builder.get_insert_block();
        arms.push((value, end, falls));
    }

    let failed = arms.iter().any(|(value, _, _)| value.is_err());
    let open: Vec<_> = arms.iter().filter(|(_, _, falls)| *falls).collect();
    let unified = match open.as_slice() {
        [(a, _, _), (b, _, _)] => unify(&a.ty, &b.ty),
        [(a, _, _)] => Some(a.ty.clone()),
        _ => None,
    };

    // Every arm is closed before anything is reported.
    let mut incoming = Vec::with_capacity(2);
    for (value, end, _) in arms.iter() {
        let Some(end) = *end else { continue };
        if end.get_terminator().is_some() {
            continue;
        }
        compiler.builder.position_at_end(end);
        let open_arm = !compiler.is_dead(end);
        if open_arm && !failed {
            if let Some(ty) = &unified {
                if let Ok(converted) = compiler.coerce(value.clone(), ty) {
                    if let Some(raw) = converted.value {
                        incoming.push((raw, end));
                    }
                }
            }
        }
        compiler.builder.build_unconditional_branch(merge_bb)?;
    }
    compiler.builder.position_at_end(merge_bb);

    if failed {
        return Err(Bail::Reported);
    }
    if open.is_empty() {
        compiler.dead_blocks.push(merge_bb);
        return Ok(TypedValue::void());
    }

    let Some(ty) = unified else {
        let (then_value, _, _) = &arms[0];
        let (else_value, _, _) = &arms[1];
        return Err(ErrorImpl::TypeMatchError {
            expected: then_value.ty.to_string(),
            received: else_value.ty.to_string(),
        }
        .into());
    };

    if ty.is_void() {
        return Ok(TypedValue::void());
    }

    trace!("if-expression unified to {}", ty);
    let phi = compiler
        .builder
        .build_phi(compiler.llvm_type(&ty)?, "ifval")?;
    for (value, block) in incoming.iter() {
        phi.add_incoming(&[(value as &dyn BasicValue<'ctx>, *block)]);
    }
    Ok(TypedValue::new(phi.as_basic_value(), ty))
}

/// Compiles a condition, which must be a `bool`.
pub(crate) fn compile_condition<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    node: &'ast Node,
) -> CompileResult<'ctx, IntValue<'ctx>> {
    let value = node.compile(compiler).checked()?;
    if value.ty != Type::BOOL {
        let mismatch = ErrorImpl::TypeMatchError {
            expected: Type::BOOL.to_string(),
            received: value.ty.to_string(),
        };
        return Err(compiler.reported(mismatch.into(), &node.span));
    }
    Ok(value.basic()?.into_int_value())
}

/// C variadic arguments: floats become `double`, small integers become `i32`.
fn promote_vararg<'ctx>(
    compiler: &Compiler<'ctx, '_>,
    value: TypedValue<'ctx>,
) -> CompileResult<'ctx> {
    if value.ty.is_float() && value.ty.float_width() < Some(64) {
        return compiler.cast(value, &Type::F64);
    }
    if value.ty.is_integer() && value.ty.int_width() < Some(32) {
        let target = if value.ty.is_signed() {
            Type::I32
        } else {
            Type::Prim(TypeTag::U32)
        };
        return compiler.cast(value, &target);
    }
    if value.ty == Type::BOOL {
        return compiler.cast(value, &Type::I32);
    }
    Ok(value)
}

fn gen_call<'ctx, 'ast>(
    compiler: &mut Compiler<'ctx, 'ast>,
    call: &'ast CallNode,
    node: &'ast Node,
) -> CompileResult<'ctx> {
    let args = unpack(compiler, &call.args)?;
    let entry = compiler.resolve_function(&call.callee)?;
    let sig = &entry.sig;

    let expected = sig.params.len();
    let received = args.len();
    if received < expected {
        return Err(ErrorImpl::MissingArguments { expected, received }.into());
    }
    if received > expected && !sig.varargs {
        return Err(ErrorImpl::UnexpectedArguments { expected, received }.into());
    }

    let mut lowered: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(received);
    let mut failed = false;
    for (index, (arg, arg_node)) in args.into_iter().zip(call.args.elements.iter()).enumerate() {
        let converted = match sig.params.get(index) {
            Some(param) => compiler.coerce(arg, param).map_err(|bail| match bail {
                Bail::Error(ErrorImpl::TypeMatchError { expected, received }) => {
                    Bail::Error(ErrorImpl::ArgumentTypeMatchError { expected, received })
                }
                other => other,
            }),
            None => promote_vararg(compiler, arg),
        };

        match converted.and_then(|value| value.basic()) {
            Ok(raw) => lowered.push(raw.into()),
            Err(bail) => {
                compiler.reported(bail, &arg_node.span);
                failed = true;
            }
        }
    }
    if failed {
        return Err(Bail::Reported);
    }

    let name = if sig.ret.is_void() { "" } else { "call" };
    let call_site = compiler.builder.build_call(entry.value, &lowered, name)?;
    trace!("call to `{}` at {}", call.callee, node.span.start);

    match call_site.try_as_basic_value().left() {
        Some(value) => Ok(TypedValue::new(value, sig.ret.clone())),
        None => Ok(TypedValue::void()),
    }
}
