//! Boundary with the source parser.
//!
//! Scanning and parsing live outside this crate. A parser hands the compiler
//! a finished statement block, or a structural error describing what it
//! expected and where.

use std::path::Path;

use crate::{
    ast::ast::Block,
    errors::errors::{Error, ErrorImpl, ParseErr},
    Position,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErr,
    pub message: String,
    /// Whether the offending token should be shown to the user.
    pub show_token: bool,
    pub token: Option<String>,
    pub position: Position,
}

impl ParseError {
    pub fn new(kind: ParseErr, message: &str, position: Position) -> Self {
        ParseError {
            kind,
            message: message.to_string(),
            show_token: false,
            token: None,
            position,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.show_token = true;
        self.token = Some(token.to_string());
        self
    }
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        Error::new(
            ErrorImpl::Parse {
                kind: error.kind,
                message: error.message,
                show_token: error.show_token,
                token: error.token,
            },
            error.position,
        )
    }
}

/// Turns a source file into the root statement block.
pub trait SourceParser {
    fn parse_file(&self, path: &Path) -> Result<Block, ParseError>;
}

impl<F> SourceParser for F
where
    F: Fn(&Path) -> Result<Block, ParseError>,
{
    fn parse_file(&self, path: &Path) -> Result<Block, ParseError> {
        self(path)
    }
}
