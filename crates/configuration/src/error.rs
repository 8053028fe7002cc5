//! Errors that can occur while loading, validating or writing a configuration.

use std::path::PathBuf;

use query_engine_metadata::metadata::SchemaError;
use thiserror::Error;

/// The errors that can be thrown when reading a configuration directory.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("could not read {file_path}: {message}")]
    IoError { file_path: PathBuf, message: String },
}

/// The errors that can be thrown when turning a parsed configuration into a runtime one.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
}

/// The errors that can be thrown when writing a configuration directory.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("could not serialize {file}: {message}")]
    Serialization { file: String, message: String },
}
