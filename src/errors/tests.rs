//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorTip, ParseErr, PipelineError};
use crate::Position;

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::VariableNotDeclared {
            variable: "foo".to_string(),
        },
        Position::new(3, 14),
    );

    assert_eq!(error.get_position().row, 3);
    assert_eq!(error.get_position().col, 14);
    assert_eq!(error.to_string(), "3:14: variable \"foo\" not declared");
}

#[test]
fn test_function_not_declared_error() {
    let error = Error::new(
        ErrorImpl::FunctionNotDeclared {
            function: "missing".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "FunctionNotDeclared");
    assert_eq!(error.get_tip().to_string(), "Function `missing` not declared");
}

#[test]
fn test_type_mismatch_error() {
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            expected: "i32".to_string(),
            received: "Str".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "TypeMatchError");
    assert_eq!(
        error.get_tip().to_string(),
        "Expected type `i32`, received `Str`"
    );
}

#[test]
fn test_argument_count_errors() {
    let too_many = Error::new(
        ErrorImpl::UnexpectedArguments {
            expected: 2,
            received: 3,
        },
        Position::null(),
    );
    let too_few = Error::new(
        ErrorImpl::MissingArguments {
            expected: 3,
            received: 1,
        },
        Position::null(),
    );

    assert_eq!(too_many.get_error_name(), "UnexpectedArguments");
    assert_eq!(too_few.get_error_name(), "MissingArguments");
    assert_eq!(too_few.get_tip().to_string(), "Expected 3 arguments, received 1");
}

#[test]
fn test_division_by_zero_error() {
    let error = Error::new(ErrorImpl::DivisionByZero, Position::null());

    assert_eq!(error.get_error_name(), "DivisionByZero");
    assert!(matches!(error.get_kind(), ErrorImpl::DivisionByZero));
}

#[test]
fn test_redeclaration_errors() {
    let variable = Error::new(
        ErrorImpl::VariableAlreadyDeclared {
            variable: "x".to_string(),
        },
        Position::null(),
    );
    let function = Error::new(
        ErrorImpl::FunctionAlreadyDeclared {
            function: "main".to_string(),
        },
        Position::null(),
    );

    assert_eq!(variable.get_error_name(), "VariableAlreadyDeclared");
    assert_eq!(function.get_error_name(), "FunctionAlreadyDeclared");
}

#[test]
fn test_binding_lifetime_errors() {
    let escaping = Error::new(
        ErrorImpl::EscapingReference {
            variable: "local".to_string(),
        },
        Position::new(7, 12),
    );
    let immutable = Error::new(
        ErrorImpl::ImmutableAssignment {
            variable: "count".to_string(),
        },
        Position::new(8, 5),
    );

    assert_eq!(escaping.get_error_name(), "EscapingReference");
    assert_eq!(
        escaping.get_tip().to_string(),
        "A reference to `local` cannot outlive its scope"
    );
    assert_eq!(immutable.get_error_name(), "ImmutableAssignment");
    assert_eq!(
        immutable.to_string(),
        "8:5: cannot assign to immutable \"count\""
    );
}

#[test]
fn test_parse_error_shows_token() {
    let error = Error::new(
        ErrorImpl::Parse {
            kind: ParseErr::Expected,
            message: "expected `)`".to_string(),
            show_token: true,
            token: Some("}".to_string()),
        },
        Position::new(1, 9),
    );

    assert_eq!(error.get_error_name(), "ParseError");
    assert_eq!(error.get_tip().to_string(), "expected `)`, found `}`");

    let hidden = Error::new(
        ErrorImpl::Parse {
            kind: ParseErr::InvalidStatement,
            message: "invalid statement".to_string(),
            show_token: false,
            token: Some("}".to_string()),
        },
        Position::new(1, 9),
    );
    assert_eq!(hidden.get_tip().to_string(), "invalid statement");
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::Builder {
            message: "no insert block".to_string(),
        },
        Position::null(),
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_pipeline_error_display() {
    let error = PipelineError::Aborted { errors: 2 };
    assert_eq!(error.to_string(), "compilation aborted after 2 error(s)");

    let error = PipelineError::Toolchain {
        tool: "llc".to_string(),
        status: 1,
    };
    assert_eq!(error.to_string(), "llc exited with status 1");
}
