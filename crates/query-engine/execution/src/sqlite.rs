//! Run queries on SQLite through an sqlx connection pool.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, Row as _, TypeInfo, ValueRef};

use crate::database::{Database, Row};
use crate::error::Error;

/// A SQLite database. In-memory databases live as long as their single connection.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connect to a database URL such as `sqlite::memory:` or `sqlite://northwind.db`.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        Ok(SqliteDatabase { pool })
    }

    /// A fresh empty in-memory database.
    pub async fn in_memory() -> Result<Self, Error> {
        Self::connect("sqlite::memory:").await
    }

    /// Run every statement of a script, in order. SQLite splits the script
    /// itself, so `;` inside string literals is left alone.
    pub async fn execute_script(&self, script: &str) -> Result<(), Error> {
        let result = self.pool.execute(script).await?;
        tracing::debug!(rows_affected = result.rows_affected(), "executed script");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, Error> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(read_row).collect()
    }
}

/// Read every column of a row as text.
fn read_row(row: &SqliteRow) -> Result<Row, Error> {
    (0..row.len())
        .map(|index| -> Result<Option<String>, Error> {
            let value = row.try_get_raw(index)?;
            if value.is_null() {
                return Ok(None);
            }
            let type_name = value.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" => Ok(Some(row.try_get::<i64, _>(index)?.to_string())),
                "REAL" => Ok(Some(row.try_get::<f64, _>(index)?.to_string())),
                "TEXT" => Ok(Some(row.try_get::<String, _>(index)?)),
                _ => Err(Error::UnsupportedValue {
                    column: index,
                    type_name,
                }),
            }
        })
        .collect()
}
