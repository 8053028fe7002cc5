//! The boundary between the compiler and whatever runs the SQL it produces.

use async_trait::async_trait;

use crate::error::Error;

/// A result row: column values as text, in projection order. `None` is SQL `NULL`.
pub type Row = Vec<Option<String>>;

/// Runs SQL text and returns every row it produces.
#[async_trait]
pub trait Database: Send + Sync {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, Error>;
}
