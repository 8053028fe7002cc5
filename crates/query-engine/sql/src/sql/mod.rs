//! The SQL AST, its rendering to SQL text, and the plans handed to execution.

pub mod ast;
pub mod convert;
pub mod dialect;
pub mod execution_plan;
pub mod helpers;
pub mod string;
