use query_engine_translation::translation::{self, CompileOptions, CompiledQuery, Error};

/// Compile a query against the Northwind configuration.
pub async fn compile(text: &str, strict: bool) -> Result<CompiledQuery, Error> {
    let configuration = tests_common::northwind::configuration()
        .await
        .expect("northwind configuration");
    let options = CompileOptions {
        strict,
        ..CompileOptions::from(&configuration)
    };
    translation::compile(text, &configuration.graph, &options)
}

/// The SQL text of a query that must compile.
pub async fn compile_to_sql(text: &str) -> String {
    compile(text, false)
        .await
        .unwrap_or_else(|error| panic!("{text} does not compile: {error}"))
        .plan
        .query_sql()
        .sql
}
