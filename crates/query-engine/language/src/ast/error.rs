//! Structural errors found while building the query tree.

use thiserror::Error;

use crate::syntax::Position;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("HAVING without GROUP at {0}")]
    HavingWithoutGroup(Position),
    #[error("aggregate function '{name}' is not allowed in FILTER, at {position}")]
    AggregateInFilter { name: String, position: Position },
    #[error("aggregate function '{name}' is not allowed in GROUP, at {position}")]
    AggregateInGroup { name: String, position: Position },
    #[error("aggregate function '{name}' is nested inside another aggregate, at {position}")]
    NestedAggregate { name: String, position: Position },
    #[error("source alias '{alias}' is declared twice, at {position}")]
    DuplicateSourceAlias { alias: String, position: Position },
    #[error("output alias '{alias}' is used twice, at {position}")]
    DuplicateOutputAlias { alias: String, position: Position },
    #[error("block '{name}' is declared twice, at {position}")]
    DuplicateBlock { name: String, position: Position },
    #[error("'{alias}' is not a source of this FIND, at {position}")]
    UnknownAlias { alias: String, position: Position },
    #[error("'*' is only allowed as the argument of count, at {position}")]
    StarArgument { position: Position },
    #[error("DISTINCT is only allowed in aggregate functions, at {position}")]
    DistinctArgument { position: Position },
    #[error("aggregate function '{name}' takes exactly one argument, at {position}")]
    AggregateArity { name: String, position: Position },
    #[error("'{unit}' is not a date unit (year, quarter, month, week, day), at {position}")]
    InvalidTruncUnit { unit: String, position: Position },
    #[error("trunc takes a unit and an expression, at {position}")]
    TruncArity { position: Position },
    #[error("both sides of a set operation must have the same number of outputs ({left} and {right}), at {position}")]
    SetArityMismatch {
        left: usize,
        right: usize,
        position: Position,
    },
    #[error("integer literal '{digits}' is out of range, at {position}")]
    IntegerOutOfRange { digits: String, position: Position },
    #[error("'{value}' is not a date of the form YYYY-MM-DD, at {position}")]
    InvalidDate { value: String, position: Position },
}
