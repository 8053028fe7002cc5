//! Errors and warnings for query translation.

use query_engine_language::ast::SemanticError;
use query_engine_language::syntax::SyntaxError;
use query_engine_metadata::metadata::ScalarType;
use thiserror::Error;

/// A query that cannot be bound to the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("entity '{entity}' not found")]
    EntityNotFound { entity: String },
    #[error("field '{field}' not found on '{alias}' ({entity})")]
    FieldNotFound {
        alias: String,
        entity: String,
        field: String,
    },
    #[error("no source has a field named '{field}'")]
    UnknownField { field: String },
    #[error("field '{field}' is ambiguous, it could come from any of {aliases:?}")]
    AmbiguousField { field: String, aliases: Vec<String> },
    #[error("no join path reaches {entities:?}")]
    UnreachableEntities { entities: Vec<String> },
    #[error("both sides of a set operation must have the same number of outputs ({left} and {right})")]
    SetArityMismatch { left: usize, right: usize },
    #[error("operator {operator} is not supported on '{field}' of type {r#type}")]
    OperatorNotSupported {
        operator: String,
        field: String,
        r#type: ScalarType,
    },
}

/// A resolved query that cannot be expressed in SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("blocks reference each other in a cycle: {}", blocks.join(" -> "))]
    CyclicBlocks { blocks: Vec<String> },
    #[error("function '{name}' is not supported")]
    UnsupportedFunction { name: String },
    #[error("queries containing {0} are not supported")]
    NotSupported(String),
    #[error("a selection has not been resolved")]
    MissingJoinPlan,
}

/// Something the compiler did that the author of the query may not expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// No join path connects the source, so it was cross joined.
    CrossJoin { alias: String, entity: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Warning::CrossJoin { alias, entity } => write!(
                f,
                "no join path reaches '{alias}' ({entity}); it is cross joined with the other sources"
            ),
        }
    }
}

/// Any failure of the compilation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("formatting changed the meaning of the query, it reads back as:\n{formatted}")]
    RoundTrip { formatted: String },
}
