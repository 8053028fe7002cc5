//! Bind the sources and field references of a single selection.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use query_engine_language::ast::{self, Expr, FieldRef, Output};
use query_engine_metadata::metadata::{ComparisonOperator, Entity, ScalarType, SchemaGraph};

use super::joins;
use super::paths::Node;
use super::{BlockField, BlockSignature, Origin};
use crate::translation::error::{ResolutionError, Warning};

/// What a source alias stands for.
pub(super) struct Binding<'a> {
    pub alias: String,
    pub optional: bool,
    pub relation: Bound<'a>,
}

pub(super) enum Bound<'a> {
    Entity(&'a Entity),
    Block(&'a BlockSignature),
}

impl Binding<'_> {
    pub fn name(&self) -> &str {
        match &self.relation {
            Bound::Entity(entity) => &entity.name,
            Bound::Block(block) => &block.name,
        }
    }

    pub fn node(&self) -> Node {
        match &self.relation {
            Bound::Entity(entity) => Node::Entity(entity.name.clone()),
            Bound::Block(block) => Node::Block(block.name.clone()),
        }
    }

    pub fn primary_key(&self) -> Option<&str> {
        match &self.relation {
            Bound::Entity(entity) => entity.primary_key.as_deref(),
            Bound::Block(_) => None,
        }
    }

    fn field_names(&self) -> Vec<String> {
        match &self.relation {
            Bound::Entity(entity) => entity.fields.keys().cloned().collect(),
            Bound::Block(block) => block.fields.keys().cloned().collect(),
        }
    }

    /// The column behind a field, and its type when known.
    fn field(&self, name: &str) -> Option<(String, Option<ScalarType>)> {
        match &self.relation {
            Bound::Entity(entity) => entity
                .field(name)
                .map(|field| (field.column_name.clone(), Some(field.r#type))),
            Bound::Block(block) => block
                .fields
                .get(name)
                .map(|field| (name.to_string(), field.r#type)),
        }
    }

    /// What a block exporting this field would know about it.
    fn export(&self, name: &str) -> BlockField {
        match &self.relation {
            Bound::Entity(entity) => BlockField {
                origin: Some(Origin {
                    entity: entity.name.clone(),
                    field: name.to_string(),
                }),
                r#type: entity.field(name).map(|field| field.r#type),
            },
            Bound::Block(block) => block.fields.get(name).cloned().unwrap_or(BlockField {
                origin: None,
                r#type: None,
            }),
        }
    }
}

/// Output aliases an unqualified name may stand for.
#[derive(Clone, Copy)]
enum OutputNames<'a> {
    None,
    /// Output aliases win over fields (`ORDER`, `HAVING`).
    First(&'a IndexMap<String, Expr>),
    /// Output aliases are used only when no field matches (`GROUP`).
    Fallback(&'a IndexMap<String, Expr>),
}

/// Resolve a selection: bind its sources, expand stars, bind every field
/// reference and plan the joins. Returns the fields the selection exports.
pub(super) fn resolve_select(
    mut select: ast::Select,
    graph: &SchemaGraph,
    blocks: &IndexMap<&str, &BlockSignature>,
    strict: bool,
    warnings: &mut Vec<Warning>,
) -> Result<(ast::Select, IndexMap<String, BlockField>), ResolutionError> {
    let bindings = select
        .sources
        .iter()
        .map(|source| {
            let relation = match blocks.get(source.entity.as_str()) {
                Some(block) => Bound::Block(*block),
                None => Bound::Entity(graph.entity(&source.entity).ok_or_else(|| {
                    ResolutionError::EntityNotFound {
                        entity: source.entity.clone(),
                    }
                })?),
            };
            Ok(Binding {
                alias: source.alias.clone(),
                optional: source.optional,
                relation,
            })
        })
        .collect::<Result<Vec<_>, ResolutionError>>()?;

    let scope = Scope {
        bindings: &bindings,
    };

    select.outputs = scope.expand_stars(std::mem::take(&mut select.outputs));

    if let Some(filter) = &mut select.filter {
        scope.bind(filter, OutputNames::None)?;
    }
    for output in &mut select.outputs {
        if let Output::Expr { expr, .. } = output {
            scope.bind(expr, OutputNames::None)?;
        }
    }

    let outputs: IndexMap<String, Expr> = select
        .outputs
        .iter()
        .filter_map(|output| match output {
            Output::Expr { expr, alias } => Some((alias.clone(), expr.clone())),
            Output::All { .. } => None,
        })
        .collect();
    for expr in &mut select.group {
        scope.bind(expr, OutputNames::Fallback(&outputs))?;
    }
    if let Some(having) = &mut select.having {
        scope.bind(having, OutputNames::First(&outputs))?;
    }
    for ordering in &mut select.order {
        scope.bind(&mut ordering.expr, OutputNames::First(&outputs))?;
    }

    let exports = outputs
        .iter()
        .map(|(alias, expr)| (alias.clone(), scope.export(expr)))
        .collect();

    let plan = joins::plan_joins(&mut select, &bindings, graph, strict, warnings)?;
    select.plan = Some(plan);
    Ok((select, exports))
}

struct Scope<'a> {
    bindings: &'a [Binding<'a>],
}

impl Scope<'_> {
    fn binding(&self, alias: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.alias == alias)
    }

    /// Replace every `alias.*` with one output per field, naming clashes the
    /// way implicit aliases are named.
    fn expand_stars(&self, outputs: Vec<Output>) -> Vec<Output> {
        let mut taken: BTreeSet<String> = outputs
            .iter()
            .filter_map(|output| match output {
                Output::Expr { alias, .. } => Some(alias.clone()),
                Output::All { .. } => None,
            })
            .collect();

        let mut expanded = Vec::with_capacity(outputs.len());
        for output in outputs {
            match output {
                Output::All { source } => {
                    let Some(binding) = self.binding(&source) else {
                        continue;
                    };
                    for field in binding.field_names() {
                        let alias = ast::unique_alias(&field, &taken);
                        taken.insert(alias.clone());
                        expanded.push(Output::Expr {
                            expr: Expr::Field(FieldRef::new(Some(&source), &field)),
                            alias,
                        });
                    }
                }
                output @ Output::Expr { .. } => expanded.push(output),
            }
        }
        expanded
    }

    fn bind(&self, expr: &mut Expr, outputs: OutputNames) -> Result<(), ResolutionError> {
        if let Expr::Field(field) = expr {
            if let Some(replacement) = self.output_for(field, outputs) {
                *expr = replacement;
                return Ok(());
            }
            return self.bind_field(field);
        }

        for child in expr.children_mut() {
            self.bind(child, outputs)?;
        }

        if let Expr::Like {
            expr: operand,
            negated,
            ..
        } = expr
        {
            self.check_like(operand, *negated)?;
        }
        Ok(())
    }

    /// The output an unqualified name stands for, if any.
    fn output_for(&self, field: &FieldRef, outputs: OutputNames) -> Option<Expr> {
        if field.source.is_some() {
            return None;
        }
        match outputs {
            OutputNames::None => None,
            OutputNames::First(outputs) => outputs.get(&field.field).cloned(),
            OutputNames::Fallback(outputs) => {
                let matches_a_field = self
                    .bindings
                    .iter()
                    .any(|binding| binding.field(&field.field).is_some());
                if matches_a_field {
                    None
                } else {
                    outputs.get(&field.field).cloned()
                }
            }
        }
    }

    fn bind_field(&self, field: &mut FieldRef) -> Result<(), ResolutionError> {
        let binding = match &field.source {
            Some(alias) => self.binding(alias).ok_or_else(|| ResolutionError::EntityNotFound {
                entity: alias.clone(),
            })?,
            None => {
                let candidates: Vec<&Binding> = self
                    .bindings
                    .iter()
                    .filter(|binding| binding.field(&field.field).is_some())
                    .collect();
                match candidates.as_slice() {
                    [binding] => *binding,
                    [] => {
                        return Err(ResolutionError::UnknownField {
                            field: field.field.clone(),
                        })
                    }
                    _ => {
                        return Err(ResolutionError::AmbiguousField {
                            field: field.field.clone(),
                            aliases: candidates
                                .iter()
                                .map(|binding| binding.alias.clone())
                                .collect(),
                        })
                    }
                }
            }
        };

        let (column, _) =
            binding
                .field(&field.field)
                .ok_or_else(|| ResolutionError::FieldNotFound {
                    alias: binding.alias.clone(),
                    entity: binding.name().to_string(),
                    field: field.field.clone(),
                })?;
        field.source = Some(binding.alias.clone());
        field.column = Some(column);
        Ok(())
    }

    fn field_type(&self, field: &FieldRef) -> Option<ScalarType> {
        let binding = self.binding(field.source.as_deref()?)?;
        binding.field(&field.field).and_then(|(_, r#type)| r#type)
    }

    fn check_like(&self, operand: &Expr, negated: bool) -> Result<(), ResolutionError> {
        let Expr::Field(field) = operand else {
            return Ok(());
        };
        let Some(r#type) = self.field_type(field) else {
            return Ok(());
        };
        let operator = if negated {
            ComparisonOperator::NotLike
        } else {
            ComparisonOperator::Like
        };
        if r#type.comparison_operators().contains(&operator) {
            Ok(())
        } else {
            Err(ResolutionError::OperatorNotSupported {
                operator: operator.name().to_string(),
                field: format!(
                    "{}.{}",
                    field.source.as_deref().unwrap_or_default(),
                    field.field
                ),
                r#type,
            })
        }
    }

    fn export(&self, expr: &Expr) -> BlockField {
        match expr {
            Expr::Field(field) => field
                .source
                .as_deref()
                .and_then(|alias| self.binding(alias))
                .map_or(
                    BlockField {
                        origin: None,
                        r#type: None,
                    },
                    |binding| binding.export(&field.field),
                ),
            Expr::Aggregate {
                function: ast::AggregateFunction::Count,
                ..
            } => BlockField {
                origin: None,
                r#type: Some(ScalarType::Integer),
            },
            _ => BlockField {
                origin: None,
                r#type: None,
            },
        }
    }
}
