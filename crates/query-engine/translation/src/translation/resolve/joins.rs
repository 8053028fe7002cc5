//! Plan the joins that connect the sources of a selection.

use std::collections::{BTreeMap, BTreeSet};

use query_engine_language::ast::{
    Expr, JoinKey, JoinKind, JoinPlan, Output, PlannedJoin, PlannedRelation, Relation, Select,
};
use query_engine_metadata::metadata::SchemaGraph;

use super::paths::{Node, Path, Routes};
use super::select::{Binding, Bound};
use crate::translation::error::{ResolutionError, Warning};

/// Choose a root source and connect every other source to it.
///
/// Sources are connected one at a time, always the one closest to the sources
/// connected so far. Intermediate entities of a path are joined under hidden
/// aliases. Filter conjuncts about outer joined sources move into the `ON`
/// clause of their join.
pub(super) fn plan_joins(
    select: &mut Select,
    bindings: &[Binding],
    graph: &SchemaGraph,
    strict: bool,
    warnings: &mut Vec<Warning>,
) -> Result<JoinPlan, ResolutionError> {
    let conjuncts = select.filter.take().map(Expr::conjuncts).unwrap_or_default();
    let anti_joins: Vec<bool> = conjuncts
        .iter()
        .map(|conjunct| is_anti_join_test(conjunct, bindings))
        .collect();
    let outer: BTreeSet<&str> = bindings
        .iter()
        .filter(|binding| {
            binding.optional
                || conjuncts
                    .iter()
                    .zip(&anti_joins)
                    .any(|(conjunct, anti_join)| {
                        *anti_join && references(conjunct).contains(binding.alias.as_str())
                    })
        })
        .map(|binding| binding.alias.as_str())
        .collect();

    let root = choose_root(select, &conjuncts, bindings, &outer);

    let blocks: Vec<_> = bindings
        .iter()
        .filter_map(|binding| match &binding.relation {
            Bound::Block(block) => Some(*block),
            Bound::Entity(_) => None,
        })
        .collect();
    let mut planner = Planner {
        graph,
        routes: Routes::new(graph, &blocks),
        taken: bindings
            .iter()
            .map(|binding| binding.alias.clone())
            .collect(),
        hidden: 0,
        connected: vec![(bindings[root].alias.clone(), bindings[root].node())],
        joins: vec![],
    };

    let mut unconnected: Vec<&Binding> = bindings
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != root)
        .map(|(_, binding)| binding)
        .collect();

    while !unconnected.is_empty() {
        let starts: Vec<Node> = planner
            .connected
            .iter()
            .map(|(_, node)| node.clone())
            .collect();
        let paths = planner.routes.shortest_paths(&starts);

        let mut closest: Option<(usize, &Path)> = None;
        for (index, binding) in unconnected.iter().enumerate() {
            if let Some(path) = paths.get(&binding.node()) {
                if closest.map_or(true, |(_, best)| path.cost < best.cost) {
                    closest = Some((index, path));
                }
            }
        }

        match closest {
            Some((index, path)) => {
                let path = path.clone();
                let binding = unconnected.remove(index);
                let kind = if outer.contains(binding.alias.as_str()) {
                    JoinKind::LeftOuter
                } else {
                    JoinKind::Inner
                };
                planner.connect(binding, &path, kind);
            }
            None if strict => {
                return Err(ResolutionError::UnreachableEntities {
                    entities: unconnected
                        .iter()
                        .map(|binding| binding.name().to_string())
                        .collect(),
                })
            }
            None => {
                let binding = unconnected.remove(0);
                tracing::warn!(
                    alias = %binding.alias,
                    entity = %binding.name(),
                    "no join path found, falling back to a cross join"
                );
                warnings.push(Warning::CrossJoin {
                    alias: binding.alias.clone(),
                    entity: binding.name().to_string(),
                });
                planner.cross_join(binding);
            }
        }
    }

    let mut joins = planner.joins;
    let outer_joined: BTreeMap<&str, usize> = joins
        .iter()
        .enumerate()
        .filter(|(_, join)| join.kind == JoinKind::LeftOuter && !join.hidden)
        .map(|(index, join)| (join.target.alias.as_str(), index))
        .collect();

    let mut kept = vec![];
    let mut moved: Vec<(usize, Expr)> = vec![];
    for (conjunct, anti_join) in conjuncts.into_iter().zip(anti_joins) {
        let latest = references(&conjunct)
            .into_iter()
            .map(|alias| outer_joined.get(alias).copied())
            .collect::<Option<Vec<usize>>>()
            .and_then(|indexes| indexes.into_iter().max());
        match latest {
            Some(index) if !anti_join => moved.push((index, conjunct)),
            _ => kept.push(conjunct),
        }
    }
    for (index, conjunct) in moved {
        joins[index].conditions.push(conjunct);
    }
    select.filter = Expr::from_conjuncts(kept);

    Ok(JoinPlan {
        root: relation(graph, &bindings[root].alias, &bindings[root].node()),
        joins,
    })
}

/// `alias.<primary key> IS NULL`: the rows of `alias` that did not join.
fn is_anti_join_test(conjunct: &Expr, bindings: &[Binding]) -> bool {
    let Expr::IsNull {
        expr,
        negated: false,
    } = conjunct
    else {
        return false;
    };
    let Expr::Field(field) = expr.as_ref() else {
        return false;
    };
    bindings.iter().any(|binding| {
        field.source.as_deref() == Some(binding.alias.as_str())
            && binding.primary_key() == Some(field.field.as_str())
    })
}

/// The source aliases an expression refers to.
fn references(expr: &Expr) -> BTreeSet<&str> {
    expr.fields()
        .into_iter()
        .filter_map(|field| field.source.as_deref())
        .collect()
}

/// The most referenced source that is not outer joined, the first one on ties.
/// When every source is outer joined, every source is a candidate.
fn choose_root<'a>(
    select: &'a Select,
    conjuncts: &'a [Expr],
    bindings: &[Binding],
    outer: &BTreeSet<&str>,
) -> usize {
    let mut counts: BTreeMap<&'a str, usize> = BTreeMap::new();
    let mut count = |expr: &'a Expr| {
        for field in expr.fields() {
            if let Some(source) = field.source.as_deref() {
                *counts.entry(source).or_default() += 1;
            }
        }
    };
    conjuncts.iter().for_each(&mut count);
    for output in &select.outputs {
        if let Output::Expr { expr, .. } = output {
            count(expr);
        }
    }
    select.group.iter().for_each(&mut count);
    select.having.iter().for_each(&mut count);
    select
        .order
        .iter()
        .for_each(|ordering| count(&ordering.expr));

    let candidates: Vec<usize> = if bindings
        .iter()
        .all(|binding| outer.contains(binding.alias.as_str()))
    {
        (0..bindings.len()).collect()
    } else {
        (0..bindings.len())
            .filter(|index| !outer.contains(bindings[*index].alias.as_str()))
            .collect()
    };

    let mut root = candidates[0];
    for index in candidates {
        let referenced = |index: usize| {
            counts
                .get(bindings[index].alias.as_str())
                .copied()
                .unwrap_or(0)
        };
        if referenced(index) > referenced(root) {
            root = index;
        }
    }
    root
}

struct Planner<'a> {
    graph: &'a SchemaGraph,
    routes: Routes<'a>,
    /// Aliases in use, so hidden aliases never collide with them.
    taken: BTreeSet<String>,
    hidden: usize,
    connected: Vec<(String, Node)>,
    joins: Vec<PlannedJoin>,
}

impl Planner<'_> {
    /// Join the hops of `path`, ending at `binding`.
    fn connect(&mut self, binding: &Binding, path: &Path, kind: JoinKind) {
        let mut left_alias = self.connected[path.start].0.clone();
        for (index, hop) in path.hops.iter().enumerate() {
            let last = index + 1 == path.hops.len();
            let alias = if last {
                binding.alias.clone()
            } else {
                self.hidden_alias(hop.to.name())
            };
            let keys = hop
                .keys
                .iter()
                .map(|key| JoinKey {
                    left_alias: left_alias.clone(),
                    left_column: column(self.graph, &hop.from, &key.source),
                    right_column: column(self.graph, &hop.to, &key.target),
                })
                .collect();
            self.joins.push(PlannedJoin {
                kind,
                target: relation(self.graph, &alias, &hop.to),
                keys,
                conditions: vec![],
                hidden: !last,
            });
            self.connected.push((alias.clone(), hop.to.clone()));
            left_alias = alias;
        }
    }

    fn cross_join(&mut self, binding: &Binding) {
        let node = binding.node();
        self.joins.push(PlannedJoin {
            kind: JoinKind::Cross,
            target: relation(self.graph, &binding.alias, &node),
            keys: vec![],
            conditions: vec![],
            hidden: false,
        });
        self.connected.push((binding.alias.clone(), node));
    }

    /// `<entity>_<n>`, numbered across the selection.
    fn hidden_alias(&mut self, entity: &str) -> String {
        loop {
            self.hidden += 1;
            let alias = format!("{entity}_{}", self.hidden);
            if self.taken.insert(alias.clone()) {
                return alias;
            }
        }
    }
}

fn relation(graph: &SchemaGraph, alias: &str, node: &Node) -> PlannedRelation {
    PlannedRelation {
        alias: alias.to_string(),
        entity: node.name().to_string(),
        relation: match node {
            Node::Block(name) => Relation::Block(name.clone()),
            Node::Entity(name) => match graph.entity(name) {
                Some(entity) => Relation::Table {
                    schema: entity.schema_name.clone(),
                    table: entity.table_name.clone(),
                },
                None => Relation::Table {
                    schema: None,
                    table: name.clone(),
                },
            },
        },
    }
}

/// Block outputs are columns of the same name.
fn column(graph: &SchemaGraph, node: &Node, field: &str) -> String {
    match node {
        Node::Entity(name) => graph
            .entity(name)
            .and_then(|entity| entity.field(field))
            .map_or_else(|| field.to_string(), |field| field.column_name.clone()),
        Node::Block(_) => field.to_string(),
    }
}
