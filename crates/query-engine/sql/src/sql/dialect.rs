//! SQL dialects the generated text can target.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The database flavour whose syntax generated SQL follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}
