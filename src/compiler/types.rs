//! Semantic types and the bridge to LLVM types.
//!
//! Every compiled node yields a [`TypedValue`]: an LLVM value paired with the
//! language-level [`Type`] it was resolved to. Promotion and coercion decisions
//! are made on the semantic type, never by inspecting raw LLVM types.

use std::fmt::{self, Display};

use inkwell::{
    builder::BuilderError,
    context::Context,
    types::{
        AnyTypeEnum, BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, StructType,
    },
    values::BasicValueEnum,
    AddressSpace,
};

use crate::{
    ast::types::{TypeNode, TypeTag},
    errors::errors::ErrorImpl,
};

use super::compiler::Compiler;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Prim(TypeTag),
    Ptr(Box<Type>),
    Array(Box<Type>, u32),
    Tuple(Vec<Type>),
    /// A user-declared record, by name.
    Data(String),
    Function(Box<FnSig>),
    /// The type of a value that failed to compile.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub ret: Type,
    pub params: Vec<Type>,
    pub varargs: bool,
}

impl Type {
    pub const VOID: Type = Type::Prim(TypeTag::Void);
    pub const BOOL: Type = Type::Prim(TypeTag::Bool);
    pub const I8: Type = Type::Prim(TypeTag::I8);
    pub const I32: Type = Type::Prim(TypeTag::I32);
    pub const I64: Type = Type::Prim(TypeTag::I64);
    pub const F64: Type = Type::Prim(TypeTag::F64);
    pub const STR: Type = Type::Prim(TypeTag::Str);

    pub fn ptr(inner: Type) -> Self {
        Type::Ptr(Box::new(inner))
    }

    pub fn tag(&self) -> Option<TypeTag> {
        match self {
            Type::Prim(tag) => Some(*tag),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        *self == Type::VOID
    }

    pub fn is_error(&self) -> bool {
        *self == Type::Error
    }

    pub fn is_integer(&self) -> bool {
        self.tag().is_some_and(TypeTag::is_integer)
    }

    pub fn is_float(&self) -> bool {
        self.tag().is_some_and(TypeTag::is_float)
    }

    pub fn is_signed(&self) -> bool {
        self.tag().is_some_and(TypeTag::is_signed)
    }

    pub fn int_width(&self) -> Option<u32> {
        self.tag().and_then(TypeTag::int_width)
    }

    pub fn float_width(&self) -> Option<u32> {
        self.tag().and_then(TypeTag::float_width)
    }

    /// Pointer-like types: raw pointers and strings.
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr(_) | Type::Prim(TypeTag::Str))
    }

    /// A name usable inside a symbol, e.g. for extension methods.
    pub fn mangled(&self) -> String {
        self.to_string()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(tag) => write!(f, "{}", tag),
            Type::Ptr(inner) => write!(f, "{}*", inner),
            Type::Array(inner, len) => write!(f, "[{}; {}]", inner, len),
            Type::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
            Type::Data(name) => write!(f, "{}", name),
            Type::Function(sig) => {
                write!(f, "fun(")?;
                for (i, param) in sig.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                if sig.varargs {
                    write!(f, ", ...")?;
                }
                write!(f, ") -> {}", sig.ret)
            }
            Type::Error => write!(f, "<error>"),
        }
    }
}

/// A declared data record.
#[derive(Debug, Clone)]
pub struct DataType<'ctx> {
    pub name: String,
    /// Field names and types, in declaration order.
    pub fields: Vec<(String, Type)>,
    pub llvm: StructType<'ctx>,
}

impl<'ctx> DataType<'ctx> {
    pub fn field_index(&self, field: &str) -> Option<(u32, &Type)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, (name, _))| name == field)
            .map(|(index, (_, ty))| (index as u32, ty))
    }
}

/// Why a node could not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Bail {
    /// The failure has already been recorded as a diagnostic.
    Reported,
    /// A failure still to be recorded against the node being compiled.
    Error(ErrorImpl),
}

impl From<ErrorImpl> for Bail {
    fn from(error: ErrorImpl) -> Self {
        Bail::Error(error)
    }
}

impl From<BuilderError> for Bail {
    fn from(error: BuilderError) -> Self {
        Bail::Error(error.into())
    }
}

pub type CompileResult<'ctx, T = TypedValue<'ctx>> = Result<T, Bail>;

/// An LLVM value paired with its resolved language type.
#[derive(Debug, Clone)]
pub struct TypedValue<'ctx> {
    /// `None` for void and error values.
    pub value: Option<BasicValueEnum<'ctx>>,
    pub ty: Type,
}

impl<'ctx> TypedValue<'ctx> {
    pub fn new(value: BasicValueEnum<'ctx>, ty: Type) -> Self {
        TypedValue {
            value: Some(value),
            ty,
        }
    }

    pub fn void() -> Self {
        TypedValue {
            value: None,
            ty: Type::VOID,
        }
    }

    pub fn error() -> Self {
        TypedValue {
            value: None,
            ty: Type::Error,
        }
    }

    pub fn is_err(&self) -> bool {
        self.ty.is_error()
    }

    pub fn is_void(&self) -> bool {
        self.ty.is_void()
    }

    /// Fails with [`Bail::Reported`] if this is an error value.
    pub fn checked(self) -> CompileResult<'ctx> {
        if self.is_err() {
            Err(Bail::Reported)
        } else {
            Ok(self)
        }
    }

    /// The underlying LLVM value; void is not a value.
    pub fn basic(&self) -> CompileResult<'ctx, BasicValueEnum<'ctx>> {
        match self.value {
            Some(value) => Ok(value),
            None if self.is_err() => Err(Bail::Reported),
            None => Err(ErrorImpl::TypeMatchError {
                expected: "a value".to_string(),
                received: self.ty.to_string(),
            }
            .into()),
        }
    }
}

/// Maps a primitive tag to its LLVM type. Void has no value representation.
pub fn tag_to_llvm(context: &Context, tag: TypeTag) -> Option<BasicTypeEnum<'_>> {
    match tag {
        TypeTag::I8 | TypeTag::U8 | TypeTag::C8 => Some(context.i8_type().into()),
        TypeTag::I16 | TypeTag::U16 => Some(context.i16_type().into()),
        TypeTag::I32 | TypeTag::U32 | TypeTag::C32 => Some(context.i32_type().into()),
        TypeTag::I64 | TypeTag::U64 | TypeTag::Isz | TypeTag::Usz => {
            Some(context.i64_type().into())
        }
        TypeTag::F16 => Some(context.f16_type().into()),
        TypeTag::F32 => Some(context.f32_type().into()),
        TypeTag::F64 => Some(context.f64_type().into()),
        TypeTag::Bool => Some(context.bool_type().into()),
        TypeTag::Str => Some(context.i8_type().ptr_type(AddressSpace::default()).into()),
        TypeTag::Void => None,
    }
}

/// Recovers a language type from an LLVM type.
///
/// LLVM integers carry no sign, so integers map to the signed tag of their width.
/// Named structs map to records of the same name.
pub fn llvm_to_type(ty: BasicTypeEnum<'_>) -> Option<Type> {
    match ty {
        BasicTypeEnum::IntType(int) => match int.get_bit_width() {
            1 => Some(Type::BOOL),
            bits => TypeTag::int_of_width(bits, true).map(Type::Prim),
        },
        BasicTypeEnum::FloatType(float) => {
            match float.print_to_string().to_string().as_str() {
                "half" => Some(Type::Prim(TypeTag::F16)),
                "float" => Some(Type::Prim(TypeTag::F32)),
                "double" => Some(Type::F64),
                _ => None,
            }
        }
        BasicTypeEnum::PointerType(ptr) => match ptr.get_element_type() {
            AnyTypeEnum::IntType(int) if int.get_bit_width() == 8 => Some(Type::STR),
            element => BasicTypeEnum::try_from(element)
                .ok()
                .and_then(llvm_to_type)
                .map(Type::ptr),
        },
        BasicTypeEnum::ArrayType(array) => {
            llvm_to_type(array.get_element_type())
                .map(|inner| Type::Array(Box::new(inner), array.len()))
        }
        BasicTypeEnum::StructType(structure) => match structure.get_name() {
            Some(name) => Some(Type::Data(name.to_string_lossy().into_owned())),
            None => structure
                .get_field_types()
                .into_iter()
                .map(llvm_to_type)
                .collect::<Option<Vec<Type>>>()
                .map(Type::Tuple),
        },
        BasicTypeEnum::VectorType(_) => None,
    }
}

impl<'ctx, 'ast> Compiler<'ctx, 'ast> {
    /// Lowers a language type to its LLVM representation.
    pub fn llvm_type(&self, ty: &Type) -> Result<BasicTypeEnum<'ctx>, ErrorImpl> {
        match ty {
            Type::Prim(tag) => tag_to_llvm(self.context, *tag).ok_or_else(|| {
                ErrorImpl::TypeMatchError {
                    expected: "a value type".to_string(),
                    received: tag.to_string(),
                }
            }),
            Type::Ptr(inner) if inner.is_void() => Ok(self
                .context
                .i8_type()
                .ptr_type(AddressSpace::default())
                .into()),
            Type::Ptr(inner) => Ok(self
                .llvm_type(inner)?
                .ptr_type(AddressSpace::default())
                .into()),
            Type::Array(inner, len) => Ok(self.llvm_type(inner)?.array_type(*len).into()),
            Type::Tuple(elements) => {
                let fields = elements
                    .iter()
                    .map(|element| self.llvm_type(element))
                    .collect::<Result<Vec<BasicTypeEnum<'ctx>>, ErrorImpl>>()?;
                Ok(self.context.struct_type(&fields, false).into())
            }
            Type::Data(name) => self
                .data_types
                .get(name)
                .map(|data| data.llvm.into())
                .ok_or_else(|| ErrorImpl::UnknownType {
                    type_: name.clone(),
                }),
            Type::Function(sig) => Ok(self
                .fn_type(sig)?
                .ptr_type(AddressSpace::default())
                .into()),
            Type::Error => Err(ErrorImpl::UnknownType {
                type_: ty.to_string(),
            }),
        }
    }

    pub fn fn_type(&self, sig: &FnSig) -> Result<FunctionType<'ctx>, ErrorImpl> {
        let params = sig
            .params
            .iter()
            .map(|param| self.llvm_type(param).map(BasicMetadataTypeEnum::from))
            .collect::<Result<Vec<BasicMetadataTypeEnum<'ctx>>, ErrorImpl>>()?;

        if sig.ret.is_void() {
            Ok(self.context.void_type().fn_type(&params, sig.varargs))
        } else {
            Ok(self.llvm_type(&sig.ret)?.fn_type(&params, sig.varargs))
        }
    }

    /// Resolves a type expression, looking user type names up among declared records.
    pub fn resolve_type(&self, type_expr: &TypeNode) -> Result<Type, ErrorImpl> {
        match type_expr {
            TypeNode::Primitive(tag) => Ok(Type::Prim(*tag)),
            TypeNode::Named(name) => {
                if self.data_types.contains_key(name) {
                    Ok(Type::Data(name.clone()))
                } else {
                    Err(ErrorImpl::UnknownType {
                        type_: name.clone(),
                    })
                }
            }
            TypeNode::Ptr(inner) => Ok(Type::ptr(self.resolve_type(inner)?)),
            TypeNode::Array(inner, len) => {
                Ok(Type::Array(Box::new(self.resolve_type(inner)?), *len))
            }
            TypeNode::Tuple(elements) => Ok(Type::Tuple(
                elements
                    .iter()
                    .map(|element| self.resolve_type(element))
                    .collect::<Result<Vec<Type>, ErrorImpl>>()?,
            )),
        }
    }
}
