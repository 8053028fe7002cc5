//! Translate EQL text into an ExecutionPlan (SQL) to be run against the database.

pub mod compile;
pub mod error;
pub mod generate;
pub mod resolve;

pub use compile::{compile, validate, CompileOptions, CompiledQuery, Validation};
pub use error::{Error, GenerationError, ResolutionError, Warning};
