//! The concrete syntax tree: the query as written, with positions.

use super::error::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub blocks: Vec<Block>,
    pub body: SetExpr,
}

/// `WITH name AS ( ... )`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: Ident,
    pub body: SetExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    Select(Box<Select>),
    Operation {
        left: Box<SetExpr>,
        operator: SetOperator,
        right: Box<SetExpr>,
        position: Position,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub position: Position,
    pub sources: Vec<Source>,
    pub filter: Option<Expr>,
    pub distinct: bool,
    pub outputs: Vec<Output>,
    pub group: Vec<Expr>,
    pub having: Option<Having>,
    pub order: Vec<Ordering>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub optional: bool,
    pub entity: Ident,
    pub alias: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// `alias.*`
    Star { source: Ident },
    Expr { expr: Expr, alias: Option<Ident> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub position: Position,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub expr: Expr,
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Digits as written; range checked when the tree is built.
    Integer(String),
    Decimal(String),
    String(String),
    Date(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// `f(*)`
    Star,
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },
    Not {
        expr: Box<Expr>,
        position: Position,
    },
    Negate {
        expr: Box<Expr>,
        position: Position,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Field {
        qualifier: Option<Ident>,
        name: Ident,
    },
    Literal {
        value: Literal,
        position: Position,
    },
    Call {
        name: Ident,
        distinct: bool,
        arguments: Arguments,
    },
    Paren {
        expr: Box<Expr>,
        position: Position,
    },
}

impl Expr {
    /// Where the expression starts.
    pub fn position(&self) -> Position {
        match self {
            Expr::Binary { left, .. } => left.position(),
            Expr::IsNull { expr, .. }
            | Expr::InList { expr, .. }
            | Expr::Like { expr, .. }
            | Expr::Between { expr, .. } => expr.position(),
            Expr::Not { position, .. }
            | Expr::Negate { position, .. }
            | Expr::Literal { position, .. }
            | Expr::Paren { position, .. } => *position,
            Expr::Field { qualifier, name } => qualifier.as_ref().unwrap_or(name).position,
            Expr::Call { name, .. } => name.position,
        }
    }
}
