//! Relationship links: joins declared alongside the schema, on top of its foreign keys.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Links declared per source entity, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Links(pub IndexMap<String, Vec<Link>>);

impl Links {
    pub fn empty() -> Self {
        Links(IndexMap::new())
    }
}

/// A single link from a source entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Link {
    /// Join the target on its primary key.
    Target(String),
    /// Join the target on explicitly listed fields.
    Columns {
        target: String,
        /// Fields of the source mapped to fields of the target.
        columns: IndexMap<String, String>,
    },
    /// A named shortcut through the listed entities. The last entity is the target.
    Path { name: String, path: Vec<String> },
}

impl Link {
    /// The entity this link leads to.
    pub fn target(&self) -> Option<&str> {
        match self {
            Link::Target(target) | Link::Columns { target, .. } => Some(target),
            Link::Path { path, .. } => path.last().map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Link, Links};

    #[test]
    fn parses_every_form_of_link() {
        let links: Links = serde_json::from_str(
            r#"{
                "orders": ["customers"],
                "employees": [{ "target": "employees", "columns": { "reports_to": "employee_id" } }],
                "customers": [{ "name": "purchased_products", "path": ["orders", "order_details", "products"] }]
            }"#,
        )
        .unwrap();

        assert_eq!(links.0["orders"], vec![Link::Target("customers".into())]);
        assert!(matches!(
            &links.0["employees"][0],
            Link::Columns { target, columns } if target == "employees" && columns["reports_to"] == "employee_id"
        ));
        assert_eq!(links.0["customers"][0].target(), Some("products"));
    }
}
