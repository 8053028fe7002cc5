//! Bind a query tree to the schema and plan the joins of every selection.

mod joins;
pub mod paths;
mod select;

use indexmap::IndexMap;

use query_engine_language::ast;
use query_engine_metadata::metadata::{ScalarType, SchemaGraph};

use super::error::{ResolutionError, Warning};

/// Options that change how a query is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveOptions {
    /// Fail instead of cross joining sources no join path reaches.
    pub strict: bool,
}

/// A query whose field references are bound and whose selections carry a join plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub query: ast::Query,
    pub warnings: Vec<Warning>,
}

/// The fields a block exposes to the selections that use it as a source.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSignature {
    pub name: String,
    pub fields: IndexMap<String, BlockField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockField {
    /// The entity field the output copies, when it is a plain field.
    pub origin: Option<Origin>,
    pub r#type: Option<ScalarType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub entity: String,
    pub field: String,
}

/// Resolve every selection of a query, blocks included.
pub fn resolve(
    query: ast::Query,
    graph: &SchemaGraph,
    options: &ResolveOptions,
) -> Result<ResolvedQuery, ResolutionError> {
    let ast::Query {
        description,
        blocks,
        body,
    } = query;

    let mut resolver = Resolver {
        graph,
        strict: options.strict,
        placeholders: blocks
            .iter()
            .map(|block| (block.name.clone(), placeholder_signature(block)))
            .collect(),
        blocks: blocks
            .into_iter()
            .map(|block| (block.name, BlockState::Pending(block.body)))
            .collect(),
        warnings: vec![],
    };

    let names: Vec<String> = resolver.blocks.keys().cloned().collect();
    for name in &names {
        resolver.resolve_block(name)?;
    }
    let (body, _) = resolver.resolve_set(body)?;

    let blocks = resolver
        .blocks
        .into_iter()
        .filter_map(|(name, state)| match state {
            BlockState::Resolved { body, .. } => Some(ast::Block { name, body }),
            BlockState::Pending(_) | BlockState::InProgress => None,
        })
        .collect();

    Ok(ResolvedQuery {
        query: ast::Query {
            description,
            blocks,
            body,
        },
        warnings: resolver.warnings,
    })
}

enum BlockState {
    Pending(ast::SetExpr),
    InProgress,
    Resolved {
        body: ast::SetExpr,
        signature: BlockSignature,
    },
}

struct Resolver<'a> {
    graph: &'a SchemaGraph,
    strict: bool,
    /// Signatures of blocks still being resolved, read off their outputs.
    placeholders: IndexMap<String, BlockSignature>,
    blocks: IndexMap<String, BlockState>,
    warnings: Vec<Warning>,
}

impl Resolver<'_> {
    /// Resolve a block unless it is resolved already or being resolved.
    ///
    /// A block that takes part in a cycle is seen through its placeholder
    /// signature by the blocks of the cycle; the cycle itself is reported when
    /// the blocks are ordered for generation.
    fn resolve_block(&mut self, name: &str) -> Result<(), ResolutionError> {
        let Some(state) = self.blocks.get_mut(name) else {
            return Ok(());
        };
        let body = match std::mem::replace(state, BlockState::InProgress) {
            BlockState::Pending(body) => body,
            other => {
                *state = other;
                return Ok(());
            }
        };

        let (body, fields) = self.resolve_set(body)?;
        let signature = BlockSignature {
            name: name.to_string(),
            fields,
        };
        self.blocks.insert(
            name.to_string(),
            BlockState::Resolved { body, signature },
        );
        Ok(())
    }

    /// Resolve each selection of a set; returns the fields of the first one.
    fn resolve_set(
        &mut self,
        set: ast::SetExpr,
    ) -> Result<(ast::SetExpr, IndexMap<String, BlockField>), ResolutionError> {
        match set {
            ast::SetExpr::Select(select) => {
                let (select, fields) = self.resolve_select(*select)?;
                Ok((ast::SetExpr::Select(Box::new(select)), fields))
            }
            ast::SetExpr::Compound {
                left,
                operator,
                right,
            } => {
                let (left, fields) = self.resolve_set(*left)?;
                let (right, right_fields) = self.resolve_set(*right)?;
                if fields.len() != right_fields.len() {
                    return Err(ResolutionError::SetArityMismatch {
                        left: fields.len(),
                        right: right_fields.len(),
                    });
                }
                Ok((
                    ast::SetExpr::Compound {
                        left: Box::new(left),
                        operator,
                        right: Box::new(right),
                    },
                    fields,
                ))
            }
        }
    }

    fn resolve_select(
        &mut self,
        select: ast::Select,
    ) -> Result<(ast::Select, IndexMap<String, BlockField>), ResolutionError> {
        for source in &select.sources {
            self.resolve_block(&source.entity)?;
        }

        let signatures: IndexMap<&str, &BlockSignature> = self
            .blocks
            .iter()
            .filter_map(|(name, state)| match state {
                BlockState::Resolved { signature, .. } => Some((name.as_str(), signature)),
                BlockState::InProgress => self
                    .placeholders
                    .get(name)
                    .map(|signature| (name.as_str(), signature)),
                BlockState::Pending(_) => None,
            })
            .collect();

        let mut warnings = vec![];
        let resolved = select::resolve_select(
            select,
            self.graph,
            &signatures,
            self.strict,
            &mut warnings,
        )?;
        self.warnings.extend(warnings);
        Ok(resolved)
    }
}

/// The outputs a block names explicitly, without origins.
fn placeholder_signature(block: &ast::Block) -> BlockSignature {
    BlockSignature {
        name: block.name.clone(),
        fields: block
            .body
            .first_select()
            .output_aliases()
            .into_iter()
            .map(|alias| {
                (
                    alias.to_string(),
                    BlockField {
                        origin: None,
                        r#type: None,
                    },
                )
            })
            .collect(),
    }
}
