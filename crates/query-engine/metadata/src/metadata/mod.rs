//! Metadata information regarding the database and the declared relationships.

pub mod database;
pub mod graph;
pub mod links;

// re-export without modules
pub use database::*;
pub use graph::*;
pub use links::*;
