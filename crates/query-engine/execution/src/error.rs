//! Errors for query execution.

use thiserror::Error;

/// Query execution error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    DB(#[from] sqlx::Error),
    #[error("row {row} has {found} columns, the query projects {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cannot read a value of type {type_name} in column {column}")]
    UnsupportedValue { column: usize, type_name: String },
}
