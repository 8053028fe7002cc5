//! Query execution against a database.
//! The compiler only hands over SQL text; anything able to run it and return
//! rows of text values can implement [`database::Database`].

pub mod database;
pub mod error;
pub mod query;
pub mod sqlite;
