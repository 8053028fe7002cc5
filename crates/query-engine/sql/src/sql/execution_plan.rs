//! Describe the SQL execution plan handed to an execution engine.

use super::ast;
use super::dialect::Dialect;
use super::string::SQL;

/// A compiled query: the statement and the names of the columns it projects, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub columns: Vec<String>,
    pub query: ast::Query,
    pub dialect: Dialect,
}

impl ExecutionPlan {
    /// Render the statement to SQL text.
    pub fn query_sql(&self) -> SQL {
        let mut sql = SQL::new(self.dialect);
        self.query.to_sql(&mut sql);
        sql
    }

    /// The statement laid out over several lines, for logs and humans.
    pub fn pretty_sql(&self) -> String {
        sqlformat::format(
            &self.query_sql().sql,
            &sqlformat::QueryParams::None,
            sqlformat::FormatOptions::default(),
        )
    }
}
