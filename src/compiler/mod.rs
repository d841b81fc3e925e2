//! Code generation module for the compiler.
//!
//! This module contains the LLVM-based code generator that turns a parsed
//! statement block into LLVM IR. It handles:
//!
//! - Compilation of expressions and statements
//! - Lexical scopes and the function registry
//! - Conversion between language types and LLVM types
//! - Prelude merging, optimisation, object emission and linking

pub mod compiler;
pub mod expr;
pub mod ops;
pub mod options;
pub mod prelude;
pub mod registry;
pub mod scope;
pub mod stmt;
pub mod toolchain;
pub mod types;
