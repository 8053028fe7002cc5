//! Metadata information regarding the entities of the database and their fields.

use std::collections::BTreeSet;

use enum_iterator::Sequence;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The scalar types a field may have.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Sequence, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Integer,
    Decimal,
    Text,
    Date,
    Timestamp,
}

impl ScalarType {
    const OPERATORS_SUPPORTED_BY_ALL_TYPES: &'static [ComparisonOperator] = &[
        ComparisonOperator::Equals,
        ComparisonOperator::NotEquals,
        ComparisonOperator::LessThan,
        ComparisonOperator::LessThanOrEqualTo,
        ComparisonOperator::GreaterThan,
        ComparisonOperator::GreaterThanOrEqualTo,
    ];

    const STRING_OPERATORS: &'static [ComparisonOperator] =
        &[ComparisonOperator::Like, ComparisonOperator::NotLike];

    /// Returns the complete set of comparison operators for the given type.
    pub fn comparison_operators(self) -> BTreeSet<ComparisonOperator> {
        let mut operators: BTreeSet<ComparisonOperator> =
            Self::OPERATORS_SUPPORTED_BY_ALL_TYPES.iter().copied().collect();
        operators.extend(match self {
            ScalarType::Text => Self::STRING_OPERATORS.iter(),
            _ => [].iter(),
        });
        operators
    }

    /// Whether values of this type can be truncated to a calendar unit.
    pub fn is_temporal(self) -> bool {
        matches!(self, ScalarType::Date | ScalarType::Timestamp)
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Integer => "integer",
            ScalarType::Decimal => "decimal",
            ScalarType::Text => "text",
            ScalarType::Date => "date",
            ScalarType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// The complete list of comparison operators a query may apply to a field.
/// Not all of these are supported for every type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
    NotLike,
}

impl ComparisonOperator {
    /// The operator as written in a query.
    pub fn name(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared entities, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    pub entities: IndexMap<String, EntityInfo>,
}

impl Schema {
    pub fn empty() -> Self {
        Schema {
            entities: IndexMap::new(),
        }
    }
}

/// Information about an entity, backed by a database table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntityInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    /// Defaults to the entity name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldInfo>,
    #[serde(default)]
    pub foreign_relations: ForeignRelations,
}

impl EntityInfo {
    /// The name of the primary key field, if one is declared.
    pub fn primary_key(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, field)| field.primary_key)
            .map(|(name, _)| name.as_str())
    }
}

/// Can this field contain null values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

/// Information about a field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldInfo {
    /// Defaults to the field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    pub r#type: ScalarType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub nullable: Nullable,
}

/// A mapping from the name of a foreign key constraint to its value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ForeignRelations(pub IndexMap<String, ForeignRelation>);

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignRelation {
    pub foreign_entity: String,
    /// Fields of this entity mapped to fields of the foreign entity.
    pub column_mapping: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::{ComparisonOperator, ScalarType};

    #[test]
    fn all_comparison_operators_are_used() {
        let all_operators = enum_iterator::all::<ComparisonOperator>().collect::<Vec<_>>();
        let used_operators = enum_iterator::all::<ScalarType>()
            .flat_map(ScalarType::comparison_operators)
            .collect::<std::collections::BTreeSet<_>>();

        for operator in all_operators {
            assert!(
                used_operators.contains(&operator),
                "{operator:?} is not used by any scalar type"
            );
        }
    }

    #[test]
    fn like_is_only_supported_on_text() {
        assert!(ScalarType::Text
            .comparison_operators()
            .contains(&ComparisonOperator::Like));
        assert!(!ScalarType::Integer
            .comparison_operators()
            .contains(&ComparisonOperator::Like));
    }
}
