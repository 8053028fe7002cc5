//! Join plans attached to a selection set by resolution.

use super::Expr;

/// How the sources of one selection set are joined, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub root: PlannedRelation,
    pub joins: Vec<PlannedJoin>,
}

impl JoinPlan {
    pub fn relations(&self) -> impl Iterator<Item = &PlannedRelation> {
        std::iter::once(&self.root).chain(self.joins.iter().map(|join| &join.target))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRelation {
    pub alias: String,
    /// The entity or block name.
    pub entity: String,
    pub relation: Relation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    Table {
        schema: Option<String>,
        table: String,
    },
    Block(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedJoin {
    pub kind: JoinKind,
    pub target: PlannedRelation,
    /// `left_alias.left_column = target.right_column`, all of them.
    pub keys: Vec<JoinKey>,
    /// Filter conjuncts evaluated as part of the `ON` clause.
    pub conditions: Vec<Expr>,
    /// An intermediate relation the query did not name.
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKey {
    pub left_alias: String,
    pub left_column: String,
    pub right_column: String,
}
