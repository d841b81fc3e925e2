#![allow(clippy::module_inception)]

use std::fmt::{self, Display};

use crate::errors::errors::{Error, ErrorTip};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod macros;
pub mod parser;

/// A 1-based row/column location in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    pub fn new(row: u32, col: u32) -> Self {
        Position { row, col }
    }

    pub fn null() -> Self {
        Position { row: 0, col: 0 }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// A span covering a single point.
    pub fn at(row: u32, col: u32) -> Self {
        let pos = Position::new(row, col);
        Span { start: pos, end: pos }
    }

    pub fn null() -> Self {
        Span::default()
    }
}

/// Returns the text of the 1-based `row` in `source`, without its line ending.
pub fn get_line_at_row(source: &str, row: u32) -> Option<&str> {
    if row == 0 {
        return None;
    }

    source
        .split_inclusive('\n')
        .nth(row as usize - 1)
        .map(|line| line.trim_end_matches(['\n', '\r']))
}

/// Renders a diagnostic together with the offending source line.
///
/// ```text
/// Error: VariableNotDeclared (Variable `a` not declared)
/// -> final.an:20:9
///    |
/// 20 | let b = a + 1
///    | --------^
/// ```
pub fn display_error(error: &Error, source: &str, file_name: &str) -> String {
    let position = error.get_position();

    let mut out = String::new();
    if let ErrorTip::None = error.get_tip() {
        out.push_str(&format!("Error: {}\n", error.get_error_name()));
    } else {
        out.push_str(&format!(
            "Error: {} ({})\n",
            error.get_error_name(),
            error.get_tip()
        ));
    }
    out.push_str(&format!("-> {}:{}\n", file_name, position));

    let Some(line_text) = get_line_at_row(source, position.row) else {
        return out;
    };

    let line_str = position.row.to_string();
    let padding = line_str.len() + 2;

    out.push_str(&format!("{:>padding$}\n", "|"));

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(line_text);
    out.push_str(&format!("{} | {}\n", line_str, line_text_removed.trim_end()));

    let arrows = (position.col as usize).saturating_sub(removed_whitespace).max(1);
    out.push_str(&format!("{:>padding$} {:->arrows$}\n", "|", "^"));

    out
}

fn remove_starting_whitespace(string: &str) -> (&str, usize) {
    let start = string.chars().take_while(|c| *c == ' ').count();
    (&string[start..], start)
}
