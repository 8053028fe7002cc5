//! Configuration for the compiler.

use std::sync::Arc;

use query_engine_metadata::metadata::SchemaGraph;
use query_engine_sql::sql::dialect::Dialect;

/// The 'Configuration' type collects all the information necessary to compile queries at runtime.
///
/// 'ParsedConfiguration' is what the configuration directory holds, in whichever version of the
/// format it was written. Values of this type are produced from a 'ParsedConfiguration' using
/// 'make_runtime_configuration', which builds the schema graph once so every compilation can
/// share it.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub graph: Arc<SchemaGraph>,
    /// Fail on sources no join path reaches instead of cross joining them.
    pub strict: bool,
    pub dialect: Dialect,
}
