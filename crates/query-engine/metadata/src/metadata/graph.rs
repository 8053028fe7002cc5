//! The schema graph: entities as nodes, foreign keys and links as edges.
//!
//! The graph is built once from the schema and the links and is never modified
//! afterwards. Every edge can be traversed in both directions; the possible
//! traversals from each entity are precomputed as [`Step`]s.

use indexmap::IndexMap;
use thiserror::Error;

use super::database::{EntityInfo, ScalarType, Schema};
use super::links::{Link, Links};

/// Problems found while building the schema graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("entity '{entity}' referenced by '{referenced_by}' is not declared")]
    UnknownEntity {
        entity: String,
        referenced_by: String,
    },
    #[error("field '{field}' referenced by '{referenced_by}' is not declared on entity '{entity}'")]
    UnknownField {
        entity: String,
        field: String,
        referenced_by: String,
    },
    #[error("entity '{entity}' declares more than one primary key: {fields:?}")]
    MultiplePrimaryKeys { entity: String, fields: Vec<String> },
    #[error("'{referenced_by}' joins {source_field} ({source_type}) with {target_field} ({target_type})")]
    TypeMismatch {
        referenced_by: String,
        source_field: String,
        source_type: ScalarType,
        target_field: String,
        target_type: ScalarType,
    },
    #[error("'{referenced_by}' does not join on any field")]
    EmptyJoin { referenced_by: String },
    #[error("cannot link '{from}' to '{to}': neither entity has a field named after the other's primary key")]
    UnresolvableLink { from: String, to: String },
    #[error("link '{name}' has no foreign key between '{from}' and '{to}'")]
    BrokenLinkPath {
        name: String,
        from: String,
        to: String,
    },
    #[error("link '{name}' has an empty path")]
    EmptyLinkPath { name: String },
}

/// An entity as seen by the query engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub schema_name: Option<String>,
    pub table_name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, Field>,
    pub primary_key: Option<String>,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

/// A field of an entity, with its physical column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub column_name: String,
    pub r#type: ScalarType,
}

/// Where an edge comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeOrigin {
    ForeignKey { constraint: String },
    Link,
}

/// A pair of fields that must be equal for two rows to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub source: String,
    pub target: String,
}

impl KeyPair {
    fn reversed(&self) -> KeyPair {
        KeyPair {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}

/// A declared, directed join between two entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub keys: Vec<KeyPair>,
    pub origin: EdgeOrigin,
}

/// A single join, oriented in the direction of traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub from: String,
    pub to: String,
    pub keys: Vec<KeyPair>,
}

impl Hop {
    pub fn reversed(&self) -> Hop {
        Hop {
            from: self.to.clone(),
            to: self.from.clone(),
            keys: self.keys.iter().map(KeyPair::reversed).collect(),
        }
    }
}

/// The cost of a traversal. Fewer hops win; on equal hops, fewer foreign key
/// hops win, which makes links preferred over equivalent foreign key paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Cost {
    pub hops: usize,
    pub foreign_key_hops: usize,
}

impl std::ops::Add for Cost {
    type Output = Cost;

    fn add(self, other: Cost) -> Cost {
        Cost {
            hops: self.hops + other.hops,
            foreign_key_hops: self.foreign_key_hops + other.foreign_key_hops,
        }
    }
}

/// One way of moving from an entity to a neighbour, possibly over several hops
/// when it comes from a multi-hop link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub from: String,
    pub to: String,
    pub hops: Vec<Hop>,
    pub via_link: bool,
}

impl Step {
    pub fn from_hop(hop: Hop, via_link: bool) -> Step {
        Step {
            from: hop.from.clone(),
            to: hop.to.clone(),
            hops: vec![hop],
            via_link,
        }
    }

    pub fn cost(&self) -> Cost {
        Cost {
            hops: self.hops.len(),
            foreign_key_hops: if self.via_link { 0 } else { self.hops.len() },
        }
    }

    fn reversed(&self) -> Step {
        Step {
            from: self.to.clone(),
            to: self.from.clone(),
            hops: self.hops.iter().rev().map(Hop::reversed).collect(),
            via_link: self.via_link,
        }
    }
}

/// A named multi-hop link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPath {
    pub name: String,
    pub source: String,
    pub hops: Vec<Hop>,
}

/// The immutable schema graph shared by every compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaGraph {
    entities: IndexMap<String, Entity>,
    edges: Vec<Edge>,
    link_paths: Vec<LinkPath>,
    steps: IndexMap<String, Vec<Step>>,
}

impl SchemaGraph {
    pub fn new(schema: &Schema, links: &Links) -> Result<SchemaGraph, SchemaError> {
        let entities = schema
            .entities
            .iter()
            .map(|(name, info)| Ok((name.clone(), make_entity(name, info)?)))
            .collect::<Result<IndexMap<_, _>, SchemaError>>()?;

        let mut graph = SchemaGraph {
            entities,
            edges: vec![],
            link_paths: vec![],
            steps: IndexMap::new(),
        };

        for (entity_name, info) in &schema.entities {
            for (constraint, relation) in &info.foreign_relations.0 {
                let referenced_by = format!("{entity_name}.{constraint}");
                let keys = relation
                    .column_mapping
                    .iter()
                    .map(|(source, target)| KeyPair {
                        source: source.clone(),
                        target: target.clone(),
                    })
                    .collect();
                let edge = Edge {
                    source: entity_name.clone(),
                    target: relation.foreign_entity.clone(),
                    keys,
                    origin: EdgeOrigin::ForeignKey {
                        constraint: constraint.clone(),
                    },
                };
                graph.check_edge(&edge, &referenced_by)?;
                graph.edges.push(edge);
            }
        }

        for (source, entity_links) in &links.0 {
            for link in entity_links {
                graph.add_link(source, link)?;
            }
        }

        graph.compute_steps();
        Ok(graph)
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn link_paths(&self) -> &[LinkPath] {
        &self.link_paths
    }

    /// The traversals available from an entity, foreign keys first, each group in
    /// declaration order.
    pub fn steps_from(&self, entity: &str) -> &[Step] {
        self.steps.get(entity).map_or(&[], Vec::as_slice)
    }

    fn add_link(&mut self, source: &str, link: &Link) -> Result<(), SchemaError> {
        let referenced_by = format!("links.{source}");
        let source_entity = self.lookup_entity(source, &referenced_by)?;

        match link {
            Link::Target(target) => {
                let target_entity = self.lookup_entity(target, &referenced_by)?;
                let key = target_entity
                    .primary_key
                    .as_ref()
                    .filter(|pk| source_entity.fields.contains_key(*pk))
                    .or_else(|| {
                        source_entity
                            .primary_key
                            .as_ref()
                            .filter(|pk| target_entity.fields.contains_key(*pk))
                    })
                    .ok_or_else(|| SchemaError::UnresolvableLink {
                        from: source.to_string(),
                        to: target.clone(),
                    })?;
                let edge = Edge {
                    source: source.to_string(),
                    target: target.clone(),
                    keys: vec![KeyPair {
                        source: key.clone(),
                        target: key.clone(),
                    }],
                    origin: EdgeOrigin::Link,
                };
                self.check_edge(&edge, &referenced_by)?;
                self.edges.push(edge);
            }
            Link::Columns { target, columns } => {
                let edge = Edge {
                    source: source.to_string(),
                    target: target.clone(),
                    keys: columns
                        .iter()
                        .map(|(source, target)| KeyPair {
                            source: source.clone(),
                            target: target.clone(),
                        })
                        .collect(),
                    origin: EdgeOrigin::Link,
                };
                self.check_edge(&edge, &referenced_by)?;
                self.edges.push(edge);
            }
            Link::Path { name, path } => {
                if path.is_empty() {
                    return Err(SchemaError::EmptyLinkPath { name: name.clone() });
                }
                let mut hops = vec![];
                let mut from = source;
                for to in path {
                    self.lookup_entity(to, &referenced_by)?;
                    let hop = self.foreign_key_hop(from, to).ok_or_else(|| {
                        SchemaError::BrokenLinkPath {
                            name: name.clone(),
                            from: from.to_string(),
                            to: to.clone(),
                        }
                    })?;
                    hops.push(hop);
                    from = to.as_str();
                }
                self.link_paths.push(LinkPath {
                    name: name.clone(),
                    source: source.to_string(),
                    hops,
                });
            }
        }
        Ok(())
    }

    /// The first declared foreign key between two entities, oriented from `from` to `to`.
    fn foreign_key_hop(&self, from: &str, to: &str) -> Option<Hop> {
        self.edges
            .iter()
            .filter(|edge| matches!(edge.origin, EdgeOrigin::ForeignKey { .. }))
            .find_map(|edge| {
                let hop = Hop {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    keys: edge.keys.clone(),
                };
                if edge.source == from && edge.target == to {
                    Some(hop)
                } else if edge.source == to && edge.target == from {
                    Some(hop.reversed())
                } else {
                    None
                }
            })
    }

    fn lookup_entity(&self, name: &str, referenced_by: &str) -> Result<&Entity, SchemaError> {
        self.entities
            .get(name)
            .ok_or_else(|| SchemaError::UnknownEntity {
                entity: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    fn check_edge(&self, edge: &Edge, referenced_by: &str) -> Result<(), SchemaError> {
        if edge.keys.is_empty() {
            return Err(SchemaError::EmptyJoin {
                referenced_by: referenced_by.to_string(),
            });
        }
        let source = self.lookup_entity(&edge.source, referenced_by)?;
        let target = self.lookup_entity(&edge.target, referenced_by)?;
        for key in &edge.keys {
            let source_field = lookup_field(source, &key.source, referenced_by)?;
            let target_field = lookup_field(target, &key.target, referenced_by)?;
            if source_field.r#type != target_field.r#type {
                return Err(SchemaError::TypeMismatch {
                    referenced_by: referenced_by.to_string(),
                    source_field: format!("{}.{}", source.name, source_field.name),
                    source_type: source_field.r#type,
                    target_field: format!("{}.{}", target.name, target_field.name),
                    target_type: target_field.r#type,
                });
            }
        }
        Ok(())
    }

    fn compute_steps(&mut self) {
        let mut all_steps = vec![];
        for edge in &self.edges {
            let hop = Hop {
                from: edge.source.clone(),
                to: edge.target.clone(),
                keys: edge.keys.clone(),
            };
            let step = Step::from_hop(hop, edge.origin == EdgeOrigin::Link);
            all_steps.push(step.reversed());
            all_steps.push(step);
        }
        for path in &self.link_paths {
            let step = Step {
                from: path.source.clone(),
                to: path.hops.last().map_or_else(String::new, |hop| hop.to.clone()),
                hops: path.hops.clone(),
                via_link: true,
            };
            all_steps.push(step.reversed());
            all_steps.push(step);
        }

        // grouped by entity, declaration order within each group
        all_steps.sort_by_key(|step| {
            self.entities
                .get_index_of(&step.from)
                .unwrap_or(usize::MAX)
        });
        for step in all_steps {
            self.steps.entry(step.from.clone()).or_default().push(step);
        }
    }
}

fn make_entity(name: &str, info: &EntityInfo) -> Result<Entity, SchemaError> {
    let primary_keys: Vec<String> = info
        .fields
        .iter()
        .filter(|(_, field)| field.primary_key)
        .map(|(name, _)| name.clone())
        .collect();
    if primary_keys.len() > 1 {
        return Err(SchemaError::MultiplePrimaryKeys {
            entity: name.to_string(),
            fields: primary_keys,
        });
    }

    Ok(Entity {
        name: name.to_string(),
        schema_name: info.schema_name.clone(),
        table_name: info.table_name.clone().unwrap_or_else(|| name.to_string()),
        description: info.description.clone(),
        fields: info
            .fields
            .iter()
            .map(|(field_name, field)| {
                (
                    field_name.clone(),
                    Field {
                        name: field_name.clone(),
                        column_name: field
                            .column_name
                            .clone()
                            .unwrap_or_else(|| field_name.clone()),
                        r#type: field.r#type,
                    },
                )
            })
            .collect(),
        primary_key: primary_keys.into_iter().next(),
    })
}

fn lookup_field<'a>(
    entity: &'a Entity,
    field: &str,
    referenced_by: &str,
) -> Result<&'a Field, SchemaError> {
    entity.field(field).ok_or_else(|| SchemaError::UnknownField {
        entity: entity.name.clone(),
        field: field.to_string(),
        referenced_by: referenced_by.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop_schema() -> Schema {
        serde_json::from_str(
            r#"{
              "entities": {
                "customers": {
                  "fields": {
                    "customer_id": { "type": "text", "primary_key": true },
                    "name": { "type": "text" }
                  }
                },
                "orders": {
                  "table_name": "sales_orders",
                  "fields": {
                    "order_id": { "type": "integer", "primary_key": true },
                    "customer_id": { "type": "text" },
                    "placed_by": { "type": "integer" }
                  },
                  "foreign_relations": {
                    "orders_customer_fkey": {
                      "foreign_entity": "customers",
                      "column_mapping": { "customer_id": "customer_id" }
                    }
                  }
                },
                "lines": {
                  "fields": {
                    "line_id": { "type": "integer", "primary_key": true },
                    "order_id": { "type": "integer", "column_name": "order_ref" },
                    "product_id": { "type": "integer" }
                  },
                  "foreign_relations": {
                    "lines_order_fkey": {
                      "foreign_entity": "orders",
                      "column_mapping": { "order_id": "order_id" }
                    }
                  }
                },
                "staff": {
                  "fields": {
                    "staff_id": { "type": "integer", "primary_key": true },
                    "manager_id": { "type": "integer" }
                  }
                }
              }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn foreign_keys_are_traversable_both_ways() {
        let graph = SchemaGraph::new(&shop_schema(), &Links::empty()).unwrap();

        let from_orders: Vec<&str> = graph
            .steps_from("orders")
            .iter()
            .map(|step| step.to.as_str())
            .collect();
        assert_eq!(from_orders, vec!["customers", "lines"]);

        let to_customers = &graph.steps_from("customers")[0];
        assert_eq!(to_customers.to, "orders");
        assert_eq!(
            to_customers.hops[0].keys,
            vec![KeyPair {
                source: "customer_id".into(),
                target: "customer_id".into()
            }]
        );
        assert_eq!(graph.entity("orders").unwrap().table_name, "sales_orders");
        assert_eq!(
            graph.entity("lines").unwrap().field("order_id").unwrap().column_name,
            "order_ref"
        );
    }

    #[test]
    fn links_are_cheaper_than_foreign_keys() {
        let links: Links = serde_json::from_str(
            r#"{
                "staff": [{ "target": "staff", "columns": { "manager_id": "staff_id" } }],
                "customers": [{ "name": "bought", "path": ["orders", "lines"] }]
            }"#,
        )
        .unwrap();
        let graph = SchemaGraph::new(&shop_schema(), &links).unwrap();

        let self_link = graph
            .steps_from("staff")
            .iter()
            .find(|step| step.to == "staff")
            .unwrap();
        assert_eq!(
            self_link.cost(),
            Cost {
                hops: 1,
                foreign_key_hops: 0
            }
        );

        let bought = graph
            .steps_from("customers")
            .iter()
            .find(|step| step.to == "lines")
            .unwrap();
        assert_eq!(bought.hops.len(), 2);
        assert_eq!(bought.hops[0].to, "orders");
        assert_eq!(
            bought.cost(),
            Cost {
                hops: 2,
                foreign_key_hops: 0
            }
        );

        let reversed = graph
            .steps_from("lines")
            .iter()
            .find(|step| step.to == "customers")
            .unwrap();
        assert_eq!(reversed.hops[0].from, "lines");
        assert_eq!(reversed.hops[1].to, "customers");
    }

    #[test]
    fn plain_link_joins_on_the_target_primary_key() {
        let links: Links = serde_json::from_str(r#"{ "orders": ["customers"] }"#).unwrap();
        let graph = SchemaGraph::new(&shop_schema(), &links).unwrap();
        let link = graph
            .edges()
            .iter()
            .find(|edge| edge.origin == EdgeOrigin::Link)
            .unwrap();
        assert_eq!(link.keys[0].source, "customer_id");
    }

    #[test]
    fn rejects_mismatched_join_types() {
        let links: Links = serde_json::from_str(
            r#"{ "orders": [{ "target": "customers", "columns": { "placed_by": "customer_id" } }] }"#,
        )
        .unwrap();
        let error = SchemaGraph::new(&shop_schema(), &links).unwrap_err();
        similar_asserts::assert_eq!(
            error,
            SchemaError::TypeMismatch {
                referenced_by: "links.orders".into(),
                source_field: "orders.placed_by".into(),
                source_type: ScalarType::Integer,
                target_field: "customers.customer_id".into(),
                target_type: ScalarType::Text,
            }
        );
    }

    #[test]
    fn rejects_unresolvable_links() {
        let links: Links = serde_json::from_str(r#"{ "staff": ["customers"] }"#).unwrap();
        assert_eq!(
            SchemaGraph::new(&shop_schema(), &links).unwrap_err(),
            SchemaError::UnresolvableLink {
                from: "staff".into(),
                to: "customers".into()
            }
        );

        let links: Links =
            serde_json::from_str(r#"{ "staff": [{ "name": "x", "path": ["orders"] }] }"#).unwrap();
        assert!(matches!(
            SchemaGraph::new(&shop_schema(), &links).unwrap_err(),
            SchemaError::BrokenLinkPath { .. }
        ));
    }
}
