//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout the compilation
//! process. It includes:
//!
//! - Diagnostics with a 1-based source position
//! - Compile-time (semantic) and parse-time (structural) error kinds
//! - Pipeline failures that stop emission and linking
//! - Helpful error messages and suggestions

pub mod errors;

#[cfg(test)]
mod tests;
