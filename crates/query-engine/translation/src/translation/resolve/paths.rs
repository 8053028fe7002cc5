//! Shortest join paths over the schema graph and the blocks of one query.
//!
//! Entities come with the traversals precomputed by the schema graph. Blocks
//! get traversals derived from the origin of their outputs for the duration of
//! one selection; the schema graph itself is never touched.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexMap;

use query_engine_metadata::metadata::{Cost, KeyPair, SchemaGraph, Step};

use super::BlockSignature;

/// Something a path can pass through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Entity(String),
    Block(String),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Entity(name) | Node::Block(name) => name,
        }
    }
}

/// One join between two nodes; `keys` pair fields of `from` with fields of `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathHop {
    pub from: Node,
    pub to: Node,
    pub keys: Vec<KeyPair>,
}

/// A traversal from a node to a neighbour, possibly through several hops.
#[derive(Debug, Clone)]
struct Route {
    to: Node,
    hops: Vec<PathHop>,
    cost: Cost,
}

impl Route {
    fn from_step(step: &Step) -> Route {
        Route {
            to: Node::Entity(step.to.clone()),
            hops: step
                .hops
                .iter()
                .map(|hop| PathHop {
                    from: Node::Entity(hop.from.clone()),
                    to: Node::Entity(hop.to.clone()),
                    keys: hop.keys.clone(),
                })
                .collect(),
            cost: step.cost(),
        }
    }

    fn single(from: Node, to: Node, source: &str, target: &str, cost: Cost) -> Route {
        Route {
            to: to.clone(),
            hops: vec![PathHop {
                from,
                to,
                keys: vec![KeyPair {
                    source: source.to_string(),
                    target: target.to_string(),
                }],
            }],
            cost,
        }
    }
}

/// A path found by [`Routes::shortest_paths`].
#[derive(Debug, Clone)]
pub struct Path {
    /// Index of the starting node.
    pub start: usize,
    pub hops: Vec<PathHop>,
    pub cost: Cost,
}

impl Path {
    fn end(&self) -> Option<&Node> {
        self.hops.last().map(|hop| &hop.to)
    }
}

/// Every traversal available to one selection.
pub struct Routes<'a> {
    graph: &'a SchemaGraph,
    derived: IndexMap<Node, Vec<Route>>,
}

impl<'a> Routes<'a> {
    /// Traversals of the schema graph, plus the ones derived for `blocks`.
    ///
    /// An output that copies a field of an entity can be joined back to that
    /// entity, can take the place of the field in any single-field join of the
    /// entity, and can be joined to an output of another block copying the same
    /// field.
    pub fn new(graph: &'a SchemaGraph, blocks: &[&BlockSignature]) -> Routes<'a> {
        let mut derived: IndexMap<Node, Vec<Route>> = IndexMap::new();
        let mut add = |route_from: Node, route: Route| {
            derived.entry(route_from).or_default().push(route);
        };

        for block in blocks {
            let block_node = Node::Block(block.name.clone());
            for (field_name, field) in &block.fields {
                let Some(origin) = &field.origin else {
                    continue;
                };
                let entity_node = Node::Entity(origin.entity.clone());
                let foreign_key = Cost {
                    hops: 1,
                    foreign_key_hops: 1,
                };
                add(
                    block_node.clone(),
                    Route::single(
                        block_node.clone(),
                        entity_node.clone(),
                        field_name,
                        &origin.field,
                        foreign_key,
                    ),
                );
                add(
                    entity_node.clone(),
                    Route::single(
                        entity_node,
                        block_node.clone(),
                        &origin.field,
                        field_name,
                        foreign_key,
                    ),
                );

                for step in graph.steps_from(&origin.entity) {
                    let [hop] = step.hops.as_slice() else {
                        continue;
                    };
                    let [key] = hop.keys.as_slice() else {
                        continue;
                    };
                    if key.source != origin.field {
                        continue;
                    }
                    let target = Node::Entity(hop.to.clone());
                    add(
                        block_node.clone(),
                        Route::single(
                            block_node.clone(),
                            target.clone(),
                            field_name,
                            &key.target,
                            step.cost(),
                        ),
                    );
                    add(
                        target.clone(),
                        Route::single(target, block_node.clone(), &key.target, field_name, step.cost()),
                    );
                }

                for other in blocks {
                    if other.name == block.name {
                        continue;
                    }
                    for (other_name, other_field) in &other.fields {
                        if other_field.origin.as_ref() == Some(origin) {
                            add(
                                block_node.clone(),
                                Route::single(
                                    block_node.clone(),
                                    Node::Block(other.name.clone()),
                                    field_name,
                                    other_name,
                                    foreign_key,
                                ),
                            );
                        }
                    }
                }
            }
        }

        Routes { graph, derived }
    }

    fn routes_from(&self, node: &Node) -> Vec<Route> {
        let mut routes: Vec<Route> = match node {
            Node::Entity(name) => self
                .graph
                .steps_from(name)
                .iter()
                .map(Route::from_step)
                .collect(),
            Node::Block(_) => vec![],
        };
        if let Some(derived) = self.derived.get(node) {
            routes.extend(derived.iter().cloned());
        }
        routes
    }

    /// The cheapest path of at least one hop from any of `starts` to every
    /// reachable node.
    ///
    /// Paths compare by [`Cost`]; equal costs keep the path found first, which
    /// follows the order of `starts` and then the declaration order of joins.
    pub fn shortest_paths(&self, starts: &[Node]) -> IndexMap<Node, Path> {
        let mut frontier = Frontier::default();
        for (start, node) in starts.iter().enumerate() {
            for route in self.routes_from(node) {
                frontier.push(Path {
                    start,
                    hops: route.hops,
                    cost: route.cost,
                });
            }
        }

        let mut settled: IndexMap<Node, Path> = IndexMap::new();
        while let Some(path) = frontier.pop() {
            let Some(node) = path.end().cloned() else {
                continue;
            };
            if settled.contains_key(&node) {
                continue;
            }
            for route in self.routes_from(&node) {
                if settled.contains_key(&route.to) {
                    continue;
                }
                let mut hops = path.hops.clone();
                hops.extend(route.hops);
                frontier.push(Path {
                    start: path.start,
                    hops,
                    cost: path.cost + route.cost,
                });
            }
            settled.insert(node, path);
        }
        settled
    }
}

/// Candidate paths, cheapest first, oldest first among equals.
#[derive(Default)]
struct Frontier {
    candidates: Vec<Option<Path>>,
    queue: BinaryHeap<Reverse<(Cost, usize)>>,
}

impl Frontier {
    fn push(&mut self, path: Path) {
        self.queue.push(Reverse((path.cost, self.candidates.len())));
        self.candidates.push(Some(path));
    }

    fn pop(&mut self) -> Option<Path> {
        let Reverse((_, index)) = self.queue.pop()?;
        self.candidates.get_mut(index).and_then(Option::take)
    }
}
