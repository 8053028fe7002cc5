//! Convert a parsed configuration into the one used when compiling queries.

use std::sync::Arc;

use query_engine_metadata::metadata::SchemaGraph;

use crate::configuration::Configuration;
use crate::error::MakeRuntimeConfigurationError;
use crate::version1::ParsedConfiguration;

/// Build the schema graph of a parsed configuration, checking every foreign key and link.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let graph = SchemaGraph::new(&parsed_config.schema, &parsed_config.links)?;
    tracing::debug!(
        entities = graph.entities().count(),
        edges = graph.edges().len(),
        "built schema graph"
    );
    Ok(Configuration {
        graph: Arc::new(graph),
        strict: parsed_config.strict,
        dialect: parsed_config.dialect,
    })
}
