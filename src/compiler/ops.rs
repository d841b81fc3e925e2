//! Operator compilation and numeric conversions.
//!
//! Binary operands are first brought to a common type by [`Compiler::reconcile`]:
//! the narrower integer is sign or zero extended according to its own
//! signedness, an integer mixed with a float is converted to the float type,
//! and the narrower float is extended. Arithmetic then uses the native
//! instruction for the unified type.

use inkwell::{
    types::{BasicTypeEnum, IntType},
    values::{BasicValue, BasicValueEnum, IntValue},
    FloatPredicate, IntPredicate,
};

use crate::{
    ast::{ast::Node, expressions::BinOp},
    errors::errors::ErrorImpl,
    COMP_ERR,
};

use super::{
    compiler::Compiler,
    types::{Bail, CompileResult, Type, TypedValue},
};

/// Whether `value` is representable in an integer of `width` bits.
pub fn int_fits(value: i128, width: u32, signed: bool) -> bool {
    if width >= 128 {
        return true;
    }
    if signed {
        let max = (1i128 << (width - 1)) - 1;
        let min = -(1i128 << (width - 1));
        value >= min && value <= max
    } else {
        value >= 0 && value <= (1i128 << width) - 1
    }
}

/// The value of a constant integer, read with the signedness of `ty`.
pub fn const_int_value(value: IntValue, ty: &Type) -> Option<i128> {
    if !value.is_const() {
        return None;
    }
    if ty.is_signed() {
        value.get_sign_extended_constant().map(i128::from)
    } else {
        value.get_zero_extended_constant().map(i128::from)
    }
}

fn mismatch(expected: &Type, received: &Type) -> Bail {
    Bail::Error(ErrorImpl::TypeMatchError {
        expected: expected.to_string(),
        received: received.to_string(),
    })
}

impl<'ctx, 'ast> Compiler<'ctx, 'ast> {
    fn int_type(&self, width: u32) -> IntType<'ctx> {
        self.context.custom_width_int_type(width)
    }

    /// Extends or truncates an integer, using the signedness of its source type.
    pub(crate) fn resize_int(
        &self,
        value: IntValue<'ctx>,
        from: &Type,
        width: u32,
    ) -> CompileResult<'ctx, IntValue<'ctx>> {
        let current = value.get_type().get_bit_width();
        let target = self.int_type(width);
        let resized = if width > current {
            if from.is_signed() {
                self.builder.build_int_s_extend(value, target, "sext")?
            } else {
                self.builder.build_int_z_extend(value, target, "zext")?
            }
        } else if width < current {
            self.builder.build_int_truncate(value, target, "trunc")?
        } else {
            value
        };
        Ok(resized)
    }

    fn int_to_float(
        &self,
        value: IntValue<'ctx>,
        from: &Type,
        to: &Type,
    ) -> CompileResult<'ctx, BasicValueEnum<'ctx>> {
        let float_type = self.llvm_type(to)?.into_float_type();
        let converted = if from.is_signed() {
            self.builder
                .build_signed_int_to_float(value, float_type, "sitofp")?
        } else {
            self.builder
                .build_unsigned_int_to_float(value, float_type, "uitofp")?
        };
        Ok(converted.into())
    }

    fn resize_float(
        &self,
        value: BasicValueEnum<'ctx>,
        from: &Type,
        to: &Type,
    ) -> CompileResult<'ctx, BasicValueEnum<'ctx>> {
        let (from_width, to_width) = match (from.float_width(), to.float_width()) {
            (Some(from_width), Some(to_width)) => (from_width, to_width),
            _ => return Err(mismatch(to, from)),
        };
        let float_type = self.llvm_type(to)?.into_float_type();
        let value = value.into_float_value();
        let resized = if to_width > from_width {
            self.builder.build_float_ext(value, float_type, "fpext")?
        } else if to_width < from_width {
            self.builder.build_float_trunc(value, float_type, "fptrunc")?
        } else {
            value
        };
        Ok(resized.into())
    }

    /// Brings two operands to a common type.
    ///
    /// # Returns
    ///
    /// The unified type and both operand values converted to it.
    pub fn reconcile(
        &self,
        lhs: &TypedValue<'ctx>,
        rhs: &TypedValue<'ctx>,
    ) -> CompileResult<'ctx, (Type, BasicValueEnum<'ctx>, BasicValueEnum<'ctx>)> {
        let l = lhs.basic()?;
        let r = rhs.basic()?;

        if lhs.ty == rhs.ty {
            return Ok((lhs.ty.clone(), l, r));
        }

        match (&lhs.ty, &rhs.ty) {
            (lt, rt) if lt.is_integer() && rt.is_integer() => {
                let lw = lt.int_width().unwrap_or(0);
                let rw = rt.int_width().unwrap_or(0);
                if lw >= rw {
                    let r = self.resize_int(r.into_int_value(), rt, lw)?;
                    Ok((lt.clone(), l, r.into()))
                } else {
                    let l = self.resize_int(l.into_int_value(), lt, rw)?;
                    Ok((rt.clone(), l.into(), r))
                }
            }
            (lt, rt) if lt.is_integer() && rt.is_float() => {
                let l = self.int_to_float(l.into_int_value(), lt, rt)?;
                Ok((rt.clone(), l, r))
            }
            (lt, rt) if lt.is_float() && rt.is_integer() => {
                let r = self.int_to_float(r.into_int_value(), rt, lt)?;
                Ok((lt.clone(), l, r))
            }
            (lt, rt) if lt.is_float() && rt.is_float() => {
                if lt.float_width() >= rt.float_width() {
                    let r = self.resize_float(r, rt, lt)?;
                    Ok((lt.clone(), l, r))
                } else {
                    let l = self.resize_float(l, lt, rt)?;
                    Ok((rt.clone(), l, r))
                }
            }
            (lt, rt) => Err(mismatch(lt, rt)),
        }
    }

    fn arith_error(&mut self, op: BinOp, ty: &Type, node: &Node) -> TypedValue<'ctx> {
        COMP_ERR!(
            self,
            ErrorImpl::UnsupportedOperator {
                operator: op.to_string(),
                type_: ty.to_string(),
            },
            &node.span
        )
    }

    fn arith(
        &mut self,
        op: BinOp,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
        node: &Node,
    ) -> TypedValue<'ctx> {
        let result = self.build_arith(op, ty, l, r);
        match result {
            Ok(Some(value)) => TypedValue::new(value, ty.clone()),
            Ok(None) => self.arith_error(op, ty, node),
            Err(bail) => self.finish(Err(bail), &node.span),
        }
    }

    fn build_arith(
        &self,
        op: BinOp,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
    ) -> CompileResult<'ctx, Option<BasicValueEnum<'ctx>>> {
        if ty.is_integer() {
            let (l, r) = (l.into_int_value(), r.into_int_value());
            let signed = ty.is_signed();
            let value = match op {
                BinOp::Add => self.builder.build_int_add(l, r, "add")?,
                BinOp::Sub => self.builder.build_int_sub(l, r, "sub")?,
                BinOp::Mul => self.builder.build_int_mul(l, r, "mul")?,
                BinOp::Div if signed => self.builder.build_int_signed_div(l, r, "div")?,
                BinOp::Div => self.builder.build_int_unsigned_div(l, r, "div")?,
                BinOp::Rem if signed => self.builder.build_int_signed_rem(l, r, "rem")?,
                BinOp::Rem => self.builder.build_int_unsigned_rem(l, r, "rem")?,
                _ => return Ok(None),
            };
            return Ok(Some(value.into()));
        }

        if ty.is_float() {
            let (l, r) = (l.into_float_value(), r.into_float_value());
            let value = match op {
                BinOp::Add => self.builder.build_float_add(l, r, "fadd")?,
                BinOp::Sub => self.builder.build_float_sub(l, r, "fsub")?,
                BinOp::Mul => self.builder.build_float_mul(l, r, "fmul")?,
                BinOp::Div => self.builder.build_float_div(l, r, "fdiv")?,
                BinOp::Rem => self.builder.build_float_rem(l, r, "frem")?,
                _ => return Ok(None),
            };
            return Ok(Some(value.into()));
        }

        Ok(None)
    }

    /// A constant integer zero divisor is rejected at compile time.
    fn check_divisor(&mut self, ty: &Type, r: BasicValueEnum<'ctx>, node: &Node) -> bool {
        if !ty.is_integer() {
            return true;
        }
        match const_int_value(r.into_int_value(), ty) {
            Some(0) => {
                COMP_ERR!(self, ErrorImpl::DivisionByZero, &node.span);
                false
            }
            _ => true,
        }
    }

    pub fn comp_add(
        &mut self,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
        op: &Node,
    ) -> TypedValue<'ctx> {
        self.arith(BinOp::Add, ty, l, r, op)
    }

    pub fn comp_sub(
        &mut self,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
        op: &Node,
    ) -> TypedValue<'ctx> {
        self.arith(BinOp::Sub, ty, l, r, op)
    }

    pub fn comp_mul(
        &mut self,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
        op: &Node,
    ) -> TypedValue<'ctx> {
        self.arith(BinOp::Mul, ty, l, r, op)
    }

    pub fn comp_div(
        &mut self,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
        op: &Node,
    ) -> TypedValue<'ctx> {
        if !self.check_divisor(ty, r, op) {
            return TypedValue::error();
        }
        self.arith(BinOp::Div, ty, l, r, op)
    }

    pub fn comp_rem(
        &mut self,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
        op: &Node,
    ) -> TypedValue<'ctx> {
        if !self.check_divisor(ty, r, op) {
            return TypedValue::error();
        }
        self.arith(BinOp::Rem, ty, l, r, op)
    }

    /// Pointer offset by an integer number of elements.
    pub(crate) fn comp_ptr_offset(
        &self,
        ptr: &TypedValue<'ctx>,
        offset: &TypedValue<'ctx>,
        negate: bool,
    ) -> CompileResult<'ctx> {
        let base = ptr.basic()?.into_pointer_value();
        let mut index = self.resize_int(offset.basic()?.into_int_value(), &offset.ty, 64)?;
        if negate {
            index = self.builder.build_int_neg(index, "neg")?;
        }
        let moved = unsafe { self.builder.build_gep(base, &[index], "offset")? };
        Ok(TypedValue::new(moved.into(), ptr.ty.clone()))
    }

    /// Compiles a comparison; the result is always `bool`.
    pub fn comp_cmp(
        &self,
        op: BinOp,
        ty: &Type,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
    ) -> CompileResult<'ctx> {
        let unsupported = || {
            Bail::Error(ErrorImpl::UnsupportedOperator {
                operator: op.to_string(),
                type_: ty.to_string(),
            })
        };

        if ty.is_float() {
            let predicate = match op {
                BinOp::Lt => FloatPredicate::OLT,
                BinOp::Gt => FloatPredicate::OGT,
                BinOp::Le => FloatPredicate::OLE,
                BinOp::Ge => FloatPredicate::OGE,
                BinOp::Eq => FloatPredicate::OEQ,
                BinOp::Ne => FloatPredicate::ONE,
                _ => return Err(unsupported()),
            };
            let value = self.builder.build_float_compare(
                predicate,
                l.into_float_value(),
                r.into_float_value(),
                "fcmp",
            )?;
            return Ok(TypedValue::new(value.into(), Type::BOOL));
        }

        let (l, r) = if ty.is_pointer() {
            let int_type = self.context.i64_type();
            (
                self.builder
                    .build_ptr_to_int(l.into_pointer_value(), int_type, "ptoi")?,
                self.builder
                    .build_ptr_to_int(r.into_pointer_value(), int_type, "ptoi")?,
            )
        } else if ty.is_integer() || *ty == Type::BOOL {
            (l.into_int_value(), r.into_int_value())
        } else {
            return Err(unsupported());
        };

        let signed = ty.is_signed();
        let ordered = ty.is_integer();
        let predicate = match op {
            BinOp::Eq => IntPredicate::EQ,
            BinOp::Ne => IntPredicate::NE,
            BinOp::Lt if ordered && signed => IntPredicate::SLT,
            BinOp::Lt if ordered => IntPredicate::ULT,
            BinOp::Gt if ordered && signed => IntPredicate::SGT,
            BinOp::Gt if ordered => IntPredicate::UGT,
            BinOp::Le if ordered && signed => IntPredicate::SLE,
            BinOp::Le if ordered => IntPredicate::ULE,
            BinOp::Ge if ordered && signed => IntPredicate::SGE,
            BinOp::Ge if ordered => IntPredicate::UGE,
            _ => return Err(unsupported()),
        };
        let value = self.builder.build_int_compare(predicate, l, r, "cmp")?;
        Ok(TypedValue::new(value.into(), Type::BOOL))
    }

    /// `and` / `or` over booleans. Both operands are always evaluated.
    pub fn comp_logic(
        &self,
        op: BinOp,
        lhs: &TypedValue<'ctx>,
        rhs: &TypedValue<'ctx>,
    ) -> CompileResult<'ctx> {
        if lhs.ty != Type::BOOL {
            return Err(mismatch(&Type::BOOL, &lhs.ty));
        }
        if rhs.ty != Type::BOOL {
            return Err(mismatch(&Type::BOOL, &rhs.ty));
        }

        let l = lhs.basic()?.into_int_value();
        let r = rhs.basic()?.into_int_value();
        let value = match op {
            BinOp::And => self.builder.build_and(l, r, "and")?,
            BinOp::Or => self.builder.build_or(l, r, "or")?,
            _ => {
                return Err(Bail::Error(ErrorImpl::UnsupportedOperator {
                    operator: op.to_string(),
                    type_: Type::BOOL.to_string(),
                }))
            }
        };
        Ok(TypedValue::new(value.into(), Type::BOOL))
    }

    /// Implicit conversion of `value` to `target`.
    ///
    /// Identical types pass through. Integers and floats may widen, and a
    /// constant integer that fits a narrower integer type is narrowed.
    /// Strings and pointers to 8-bit integers share a representation.
    pub fn coerce(&self, value: TypedValue<'ctx>, target: &Type) -> CompileResult<'ctx> {
        if value.ty == *target {
            return Ok(value);
        }
        let raw = value.basic()?;
        let from = &value.ty;

        if from.is_integer() && target.is_integer() {
            let from_width = from.int_width().unwrap_or(0);
            let to_width = target.int_width().unwrap_or(0);
            let widens = to_width > from_width
                && (from.is_signed() == target.is_signed() || !from.is_signed());
            let fits = const_int_value(raw.into_int_value(), from)
                .is_some_and(|constant| int_fits(constant, to_width, target.is_signed()));
            if widens || fits {
                let resized = self.resize_int(raw.into_int_value(), from, to_width)?;
                return Ok(TypedValue::new(resized.into(), target.clone()));
            }
        }

        if from.is_float() && target.is_float() && target.float_width() > from.float_width() {
            let resized = self.resize_float(raw, from, target)?;
            return Ok(TypedValue::new(resized, target.clone()));
        }

        if let (true, true) = (from.is_pointer(), target.is_pointer()) {
            let byte_pointers = [from, target].iter().all(|ty| match ty {
                Type::Ptr(inner) => inner.int_width() == Some(8),
                _ => true,
            });
            if byte_pointers {
                return Ok(TypedValue::new(raw, target.clone()));
            }
        }

        Err(mismatch(target, from))
    }

    /// Explicit conversion of `value` to `target`.
    pub fn cast(&self, value: TypedValue<'ctx>, target: &Type) -> CompileResult<'ctx> {
        if value.ty == *target {
            return Ok(value);
        }
        let raw = value.basic()?;
        let from = value.ty.clone();
        let invalid = || {
            Bail::Error(ErrorImpl::InvalidCast {
                from: from.to_string(),
                to: target.to_string(),
            })
        };

        if let Type::Data(name) = target {
            return self.cast_to_data(value, name).map_err(|bail| match bail {
                Bail::Error(ErrorImpl::TypeMatchError { .. }) => invalid(),
                other => other,
            });
        }

        let llvm_target: BasicTypeEnum<'ctx> = self.llvm_type(target)?;
        let converted: BasicValueEnum<'ctx> = if from.is_integer() && target.is_integer() {
            let width = target.int_width().unwrap_or(0);
            if let Some(constant) = const_int_value(raw.into_int_value(), &from) {
                if !int_fits(constant, width, target.is_signed()) {
                    return Err(Bail::Error(ErrorImpl::IntegerOverflow {
                        value: constant.to_string(),
                        type_: target.to_string(),
                    }));
                }
            }
            self.resize_int(raw.into_int_value(), &from, width)?.into()
        } else if from.is_integer() && target.is_float() {
            self.int_to_float(raw.into_int_value(), &from, target)?
        } else if from.is_float() && target.is_integer() {
            let int_type = llvm_target.into_int_type();
            let value = raw.into_float_value();
            if target.is_signed() {
                self.builder
                    .build_float_to_signed_int(value, int_type, "fptosi")?
                    .into()
            } else {
                self.builder
                    .build_float_to_unsigned_int(value, int_type, "fptoui")?
                    .into()
            }
        } else if from.is_float() && target.is_float() {
            self.resize_float(raw, &from, target)?
        } else if from == Type::BOOL && target.is_integer() {
            self.builder
                .build_int_z_extend(raw.into_int_value(), llvm_target.into_int_type(), "btoi")?
                .into()
        } else if from.is_integer() && *target == Type::BOOL {
            let zero = raw.into_int_value().get_type().const_zero();
            self.builder
                .build_int_compare(IntPredicate::NE, raw.into_int_value(), zero, "itob")?
                .into()
        } else if from.is_pointer() && target.is_pointer() {
            self.builder
                .build_pointer_cast(
                    raw.into_pointer_value(),
                    llvm_target.into_pointer_type(),
                    "pcast",
                )?
                .into()
        } else if from.is_pointer() && target.is_integer() {
            self.builder
                .build_ptr_to_int(raw.into_pointer_value(), llvm_target.into_int_type(), "ptoi")?
                .into()
        } else if from.is_integer() && target.is_pointer() {
            self.builder
                .build_int_to_ptr(raw.into_int_value(), llvm_target.into_pointer_type(), "itop")?
                .into()
        } else {
            return Err(invalid());
        };

        Ok(TypedValue::new(converted, target.clone()))
    }

    /// Builds a record from a tuple of its field values, or from a single
    /// value for a one-field record.
    fn cast_to_data(&self, value: TypedValue<'ctx>, name: &str) -> CompileResult<'ctx> {
        let data = self
            .data_types
            .get(name)
            .ok_or_else(|| ErrorImpl::UnknownType {
                type_: name.to_string(),
            })?;
        let target = Type::Data(name.to_string());

        let parts = match &value.ty {
            Type::Tuple(elements) => {
                let tuple = value.basic()?.into_struct_value();
                let mut parts = Vec::with_capacity(elements.len());
                for (index, ty) in elements.iter().enumerate() {
                    let element = self
                        .builder
                        .build_extract_value(tuple, index as u32, "elem")?;
                    parts.push(TypedValue::new(element, ty.clone()));
                }
                parts
            }
            _ => vec![value.clone()],
        };

        if parts.len() != data.fields.len() {
            return Err(mismatch(&target, &value.ty));
        }

        let mut record = data.llvm.get_undef();
        for (index, (part, (_, field_ty))) in
            parts.into_iter().zip(data.fields.iter()).enumerate()
        {
            let field = self.coerce(part, field_ty)?.basic()?;
            record = self
                .builder
                .build_insert_value(record, field, index as u32, "field")?
                .into_struct_value();
        }

        Ok(TypedValue::new(record.as_basic_value_enum(), target))
    }
}
