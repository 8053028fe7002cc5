use query_engine_execution::query::{execute, QueryResult};
use query_engine_translation::translation::{self, CompileOptions, CompiledQuery, Warning};

/// What running a query produced.
pub struct Outcome {
    pub compiled: CompiledQuery,
    pub result: QueryResult,
}

impl Outcome {
    pub fn warnings(&self) -> &[Warning] {
        &self.compiled.warnings
    }

    /// The values of one column, `NULL` as `None`.
    pub fn column(&self, index: usize) -> Vec<Option<&str>> {
        self.result
            .rows
            .iter()
            .map(|row| row[index].as_deref())
            .collect()
    }
}

/// Compile a query against the Northwind configuration and run it on a fresh database.
pub async fn run(text: &str, strict: bool) -> anyhow::Result<Outcome> {
    let configuration = tests_common::northwind::configuration().await?;
    let database = tests_common::northwind::database().await?;
    let options = CompileOptions {
        strict,
        ..CompileOptions::from(&configuration)
    };
    let compiled = translation::compile(text, &configuration.graph, &options)?;
    let result = execute(&database, &compiled.plan).await?;
    Ok(Outcome { compiled, result })
}
