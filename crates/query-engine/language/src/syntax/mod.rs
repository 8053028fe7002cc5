//! Tokenizing and parsing EQL text into a concrete syntax tree.

pub mod cst;
pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{Position, SyntaxError};
pub use parser::{parse, Parsed};
