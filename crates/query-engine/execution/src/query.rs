//! Execute an execution plan against the database.

use tracing::{info_span, Instrument};

use query_engine_sql::sql;

use crate::database::{Database, Row};
use crate::error::Error;

/// The rows a plan produced, with the names of its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Execute a plan, checking every row against the columns the plan projects.
pub async fn execute(
    database: &dyn Database,
    plan: &sql::execution_plan::ExecutionPlan,
) -> Result<QueryResult, Error> {
    let query = plan.query_sql();

    tracing::info!(generated_sql = query.sql, dialect = ?plan.dialect);
    tracing::debug!("\n{}", plan.pretty_sql());

    let rows = database
        .fetch_rows(&query.sql)
        .instrument(info_span!("Database request"))
        .await?;

    async { rows_to_result(&plan.columns, rows) }
        .instrument(info_span!("Create response"))
        .await
}

fn rows_to_result(columns: &[String], rows: Vec<Row>) -> Result<QueryResult, Error> {
    if let Some((index, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(Error::RowWidth {
            row: index,
            expected: columns.len(),
            found: row.len(),
        });
    }
    Ok(QueryResult {
        columns: columns.to_vec(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers every query with the same rows.
    struct Canned(Vec<Row>);

    #[async_trait]
    impl Database for Canned {
        async fn fetch_rows(&self, _sql: &str) -> Result<Vec<Row>, Error> {
            Ok(self.0.clone())
        }
    }

    fn plan(columns: &[&str]) -> sql::execution_plan::ExecutionPlan {
        let select = sql::helpers::simple_select(
            columns
                .iter()
                .map(|column| {
                    (
                        sql::helpers::make_column_alias((*column).to_string()),
                        sql::ast::Expression::Value(sql::ast::Value::Int8(1)),
                    )
                })
                .collect(),
        );
        sql::execution_plan::ExecutionPlan {
            columns: columns.iter().map(ToString::to_string).collect(),
            query: sql::ast::Query {
                with: sql::helpers::empty_with(),
                body: sql::ast::SetExpression::Select(Box::new(select)),
            },
            dialect: sql::dialect::Dialect::Sqlite,
        }
    }

    #[tokio::test]
    async fn rows_come_back_with_their_columns() {
        let database = Canned(vec![vec![Some("1".into()), None]]);
        let result = execute(&database, &plan(&["a", "b"])).await.unwrap();
        assert_eq!(result.columns, vec!["a", "b"]);
        assert_eq!(result.rows, vec![vec![Some("1".to_string()), None]]);
    }

    #[tokio::test]
    async fn rows_of_the_wrong_width_are_rejected() {
        let database = Canned(vec![vec![Some("1".into())]]);
        let error = execute(&database, &plan(&["a", "b"])).await.unwrap_err();
        assert!(matches!(
            error,
            Error::RowWidth {
                row: 0,
                expected: 2,
                found: 1
            }
        ));
    }
}
