use std::fmt::Display;

use inkwell::builder::BuilderError;
use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_kind(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::Parse { .. } => "ParseError",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::IntegerOverflow { .. } => "IntegerOverflow",
            ErrorImpl::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::TypeAlreadyDeclared { .. } => "TypeAlreadyDeclared",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::MissingArguments { .. } => "MissingArguments",
            ErrorImpl::ArgumentTypeMatchError { .. } => "ArgumentTypeMatchError",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::UnsupportedOperator { .. } => "UnsupportedOperator",
            ErrorImpl::InvalidCast { .. } => "InvalidCast",
            ErrorImpl::DivisionByZero => "DivisionByZero",
            ErrorImpl::ExpectedExplicitValue => "ExpectedExplicitValue",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::UnknownField { .. } => "UnknownField",
            ErrorImpl::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            ErrorImpl::EmptyArrayLiteral => "EmptyArrayLiteral",
            ErrorImpl::NotAddressable { .. } => "NotAddressable",
            ErrorImpl::ImmutableAssignment { .. } => "ImmutableAssignment",
            ErrorImpl::InvalidAssignTarget => "InvalidAssignTarget",
            ErrorImpl::EscapingReference { .. } => "EscapingReference",
            ErrorImpl::MissingReturn { .. } => "MissingReturn",
            ErrorImpl::InvalidImport => "InvalidImport",
            ErrorImpl::Builder { .. } => "BuilderError",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::Parse {
                message,
                show_token,
                token,
                ..
            } => match (show_token, token) {
                (true, Some(token)) => {
                    ErrorTip::Suggestion(format!("{}, found `{}`", message, token))
                }
                _ => ErrorTip::Suggestion(message.clone()),
            },
            ErrorImpl::NumberParseError { token } => {
                ErrorTip::Suggestion(format!("Invalid number literal: `{}`", token))
            }
            ErrorImpl::IntegerOverflow { value, type_ } => ErrorTip::Suggestion(format!(
                "Value `{}` does not fit in type `{}`",
                value, type_
            )),
            ErrorImpl::VariableAlreadyDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` already declared", variable))
            }
            ErrorImpl::VariableNotDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` not declared", variable))
            }
            ErrorImpl::FunctionNotDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` not declared", function))
            }
            ErrorImpl::FunctionAlreadyDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` already declared", function))
            }
            ErrorImpl::TypeAlreadyDeclared { type_ } => {
                ErrorTip::Suggestion(format!("Type `{}` already declared", type_))
            }
            ErrorImpl::UnexpectedArguments { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::MissingArguments { expected, received } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            ErrorImpl::ArgumentTypeMatchError { expected, received } => {
                ErrorTip::Suggestion(format!(
                    "Expected argument type `{}`, received `{}`",
                    expected, received
                ))
            }
            ErrorImpl::TypeMatchError { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::UnsupportedOperator { operator, type_ } => ErrorTip::Suggestion(format!(
                "Operator `{}` cannot be applied to type `{}`",
                operator, type_
            )),
            ErrorImpl::InvalidCast { from, to } => {
                ErrorTip::Suggestion(format!("Cannot cast `{}` to `{}`", from, to))
            }
            ErrorImpl::DivisionByZero => {
                ErrorTip::Suggestion(String::from("Divisor is a constant zero"))
            }
            ErrorImpl::ExpectedExplicitValue => ErrorTip::Suggestion(String::from(
                "Expected explicit value when no type is given",
            )),
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
            ErrorImpl::UnknownField { field, type_ } => {
                ErrorTip::Suggestion(format!("Type `{}` has no field `{}`", type_, field))
            }
            ErrorImpl::IndexOutOfBounds { index, len } => ErrorTip::Suggestion(format!(
                "Index {} is out of bounds for length {}",
                index, len
            )),
            ErrorImpl::EmptyArrayLiteral => ErrorTip::Suggestion(String::from(
                "Array literals need at least one element",
            )),
            ErrorImpl::NotAddressable { variable } => ErrorTip::Suggestion(format!(
                "`{}` is an immutable binding and has no address",
                variable
            )),
            ErrorImpl::ImmutableAssignment { variable } => {
                ErrorTip::Suggestion(format!("Cannot assign twice to immutable `{}`", variable))
            }
            ErrorImpl::InvalidAssignTarget => ErrorTip::Suggestion(String::from(
                "Only mutable variables and dereferenced pointers can be assigned to",
            )),
            ErrorImpl::EscapingReference { variable } => ErrorTip::Suggestion(format!(
                "A reference to `{}` cannot outlive its scope",
                variable
            )),
            ErrorImpl::MissingReturn { function } => ErrorTip::Suggestion(format!(
                "Function `{}` does not return a value on every path",
                function
            )),
            ErrorImpl::InvalidImport => ErrorTip::Suggestion(String::from(
                "Expected a module name or path after `import`",
            )),
            ErrorImpl::Builder { .. } => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.internal_error)
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

/// Structural errors produced by the external parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErr {
    Expected,
    ValueNotFound,
    IdentNotFound,
    InvalidStatement,
}

impl Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErr::Expected => write!(f, "expected"),
            ParseErr::ValueNotFound => write!(f, "value not found"),
            ParseErr::IdentNotFound => write!(f, "identifier not found"),
            ParseErr::InvalidStatement => write!(f, "invalid statement"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("parse error ({kind}): {message}")]
    Parse {
        kind: ParseErr,
        message: String,
        show_token: bool,
        token: Option<String>,
    },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("integer {value} overflows {type_}")]
    IntegerOverflow { value: String, type_: String },
    #[error("variable {variable:?} already declared")]
    VariableAlreadyDeclared { variable: String },
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("function {function:?} not declared")]
    FunctionNotDeclared { function: String },
    #[error("function {function:?} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("type {type_:?} already declared")]
    TypeAlreadyDeclared { type_: String },
    #[error("unexpected arguments: expected {expected:?}, received {received:?}")]
    UnexpectedArguments { expected: usize, received: usize },
    #[error("missing arguments: expected {expected:?}, received {received:?}")]
    MissingArguments { expected: usize, received: usize },
    #[error("argument types do not match: expected {expected:?}, received {received:?}")]
    ArgumentTypeMatchError { expected: String, received: String },
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    TypeMatchError { expected: String, received: String },
    #[error("operator {operator} is not supported on {type_}")]
    UnsupportedOperator { operator: String, type_: String },
    #[error("invalid cast from {from} to {to}")]
    InvalidCast { from: String, to: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("expected explicit value when no type is given")]
    ExpectedExplicitValue,
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
    #[error("unknown field {field} on {type_}")]
    UnknownField { field: String, type_: String },
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: u64, len: u64 },
    #[error("empty array literal")]
    EmptyArrayLiteral,
    #[error("cannot take the address of {variable:?}")]
    NotAddressable { variable: String },
    #[error("cannot assign to immutable {variable:?}")]
    ImmutableAssignment { variable: String },
    #[error("invalid assignment target")]
    InvalidAssignTarget,
    #[error("reference to {variable:?} escapes its scope")]
    EscapingReference { variable: String },
    #[error("missing return in {function:?}")]
    MissingReturn { function: String },
    #[error("invalid import")]
    InvalidImport,
    #[error("llvm builder error: {message}")]
    Builder { message: String },
}

impl From<BuilderError> for ErrorImpl {
    fn from(error: BuilderError) -> Self {
        ErrorImpl::Builder {
            message: error.to_string(),
        }
    }
}

/// Failures of the module/object pipeline, as opposed to diagnostics about the program.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("compilation aborted after {errors} error(s)")]
    Aborted { errors: usize },
    #[error("cannot go from the {from} stage to the {to} stage")]
    OutOfOrder { from: String, to: String },
    #[error("failed to load prelude: {0}")]
    Prelude(String),
    #[error("module verification failed: {0}")]
    Verify(String),
    #[error("{tool} exited with status {status}")]
    Toolchain { tool: String, status: i32 },
    #[error("io error: {0}")]
    Io(String),
}
