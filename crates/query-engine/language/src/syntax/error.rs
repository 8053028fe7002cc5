//! Errors raised while tokenizing or parsing.

use thiserror::Error;

/// A location in the query text. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Position {
        Position { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The first point at which the text stops following the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {position}: found {found}, expected {expected}")]
pub struct SyntaxError {
    pub position: Position,
    pub found: String,
    pub expected: String,
}
