//! Utility macros for the compiler.
//!
//! This module defines helper macros used throughout the compiler:
//!
//! - `MK_NODE!` - Creates a Node instance
//! - `COMP_ERR!` - Records a diagnostic and yields the error value
//!
//! These macros reduce boilerplate in the code generator and in tests
//! that build syntax trees by hand.

/// Creates a Node instance.
///
/// # Arguments
///
/// * `$kind` - The NodeKind
/// * `$span` - The source span
///
/// # Example
///
/// ```ignore
/// let node = MK_NODE!(NodeKind::Var("x".to_string()), Span::at(1, 5));
/// ```
#[macro_export]
macro_rules! MK_NODE {
    ($kind:expr, $span:expr) => {
        $crate::ast::ast::Node {
            kind: $kind,
            span: $span,
        }
    };
}

/// Records a compile error on the compiler and evaluates to the error value.
///
/// # Arguments
///
/// * `$compiler` - The Compiler recording the diagnostic
/// * `$error` - The ErrorImpl describing the failure
/// * `$span` - Span of the offending node
///
/// # Example
///
/// ```ignore
/// return COMP_ERR!(compiler, ErrorImpl::DivisionByZero, &node.span);
/// ```
#[macro_export]
macro_rules! COMP_ERR {
    ($compiler:expr, $error:expr, $span:expr) => {
        $compiler.comp_err($error, $span)
    };
}
