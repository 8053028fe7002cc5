//! The compilation pipeline: text to tree, tree to plan.

use query_engine_language::ast;
use query_engine_language::format::format;
use query_engine_language::syntax;
use query_engine_metadata::metadata::SchemaGraph;
use query_engine_sql::sql;

use super::error::{Error, Warning};
use super::generate::{generate, GenerateOptions};
use super::resolve::{resolve, ResolveOptions, ResolvedQuery};

/// Options of a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    /// Fail instead of cross joining sources no join path reaches.
    pub strict: bool,
    pub dialect: sql::dialect::Dialect,
}

impl From<&eql_configuration::Configuration> for CompileOptions {
    fn from(configuration: &eql_configuration::Configuration) -> Self {
        CompileOptions {
            strict: configuration.strict,
            dialect: configuration.dialect,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub plan: sql::execution_plan::ExecutionPlan,
    pub warnings: Vec<Warning>,
}

/// A query that compiles, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub formatted: String,
    pub warnings: Vec<Warning>,
}

/// Compile EQL text to an execution plan.
pub fn compile(
    text: &str,
    graph: &SchemaGraph,
    options: &CompileOptions,
) -> Result<CompiledQuery, Error> {
    let query = build_text(text)?;
    let resolved = resolve_query(query, graph, options)?;
    let plan = generate(
        &resolved,
        &GenerateOptions {
            dialect: options.dialect,
        },
    )?;

    tracing::debug!(sql = %plan.query_sql().sql, "compiled query");
    Ok(CompiledQuery {
        plan,
        warnings: resolved.warnings,
    })
}

/// Check that EQL text compiles, and that its canonical form reads back as
/// the same query.
pub fn validate(
    text: &str,
    graph: &SchemaGraph,
    options: &CompileOptions,
) -> Result<Validation, Error> {
    let query = build_text(text)?;
    let formatted = format(&query);

    let resolved = resolve_query(query.clone(), graph, options)?;
    generate(
        &resolved,
        &GenerateOptions {
            dialect: options.dialect,
        },
    )?;

    match build_text(&formatted) {
        Ok(rebuilt) if rebuilt == query => Ok(Validation {
            formatted,
            warnings: resolved.warnings,
        }),
        _ => Err(Error::RoundTrip { formatted }),
    }
}

fn build_text(text: &str) -> Result<ast::Query, Error> {
    let parsed = syntax::parse(text)?;
    Ok(ast::build(&parsed)?)
}

fn resolve_query(
    query: ast::Query,
    graph: &SchemaGraph,
    options: &CompileOptions,
) -> Result<ResolvedQuery, Error> {
    Ok(resolve(
        query,
        graph,
        &ResolveOptions {
            strict: options.strict,
        },
    )?)
}
