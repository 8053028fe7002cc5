//! The query tree produced from the concrete syntax tree.
//!
//! The tree carries no source positions, so two queries that differ only in
//! layout, comments, redundant parentheses or keyword case build the same tree.
//! Field references and join plans are filled in by resolution.

pub mod build;
pub mod error;
pub mod plan;

pub use build::build;
pub use error::SemanticError;
pub use plan::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub description: Option<String>,
    pub blocks: Vec<Block>,
    pub body: SetExpr,
}

/// An auxiliary block, usable as a source by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub body: SetExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    Select(Box<Select>),
    Compound {
        left: Box<SetExpr>,
        operator: SetOperator,
        right: Box<SetExpr>,
    },
}

impl SetExpr {
    /// Every selection set, left to right.
    pub fn selects(&self) -> Vec<&Select> {
        match self {
            SetExpr::Select(select) => vec![select],
            SetExpr::Compound { left, right, .. } => {
                let mut selects = left.selects();
                selects.extend(right.selects());
                selects
            }
        }
    }

    pub fn selects_mut(&mut self) -> Vec<&mut Select> {
        match self {
            SetExpr::Select(select) => vec![select],
            SetExpr::Compound { left, right, .. } => {
                let mut selects = left.selects_mut();
                selects.extend(right.selects_mut());
                selects
            }
        }
    }

    /// The selection set whose outputs name the columns of the whole expression.
    pub fn first_select(&self) -> &Select {
        match self {
            SetExpr::Select(select) => select,
            SetExpr::Compound { left, .. } => left.first_select(),
        }
    }
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
    pub sources: Vec<Source>,
    pub filter: Option<Expr>,
    pub distinct: bool,
    pub outputs: Vec<Output>,
    pub group: Vec<Expr>,
    pub having: Option<Expr>,
    pub order: Vec<Ordering>,
    pub limit: Option<u64>,
    /// Set by resolution.
    pub plan: Option<JoinPlan>,
}

impl Select {
    pub fn source(&self, alias: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.alias == alias)
    }

    /// Aliases of the expression outputs, in order.
    pub fn output_aliases(&self) -> Vec<&str> {
        self.outputs
            .iter()
            .filter_map(|output| match output {
                Output::Expr { alias, .. } => Some(alias.as_str()),
                Output::All { .. } => None,
            })
            .collect()
    }
}

/// An entity or block named in `FIND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub entity: String,
    pub alias: String,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Expr { expr: Expr, alias: String },
    /// Every field of a source; expanded by resolution.
    All { source: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub expr: Expr,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A reference to a field of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// The source alias. Filled in by resolution when the query leaves it out.
    pub source: Option<String>,
    pub field: String,
    /// The physical column. Filled in by resolution.
    pub column: Option<String>,
}

impl FieldRef {
    pub fn new(source: Option<&str>, field: &str) -> FieldRef {
        FieldRef {
            source: source.map(str::to_string),
            field: field.to_string(),
            column: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    /// Kept as written so no precision is lost.
    Decimal(String),
    String(String),
    Date(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::Equals => "=",
            CompareOperator::NotEquals => "!=",
            CompareOperator::LessThan => "<",
            CompareOperator::LessThanOrEqualTo => "<=",
            CompareOperator::GreaterThan => ">",
            CompareOperator::GreaterThanOrEqualTo => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

impl ArithmeticOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulo => "%",
            ArithmeticOperator::Concat => "||",
        }
    }

    pub fn is_multiplicative(self) -> bool {
        matches!(
            self,
            ArithmeticOperator::Multiply | ArithmeticOperator::Divide | ArithmeticOperator::Modulo
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn lookup(name: &str) -> Option<AggregateFunction> {
        match name {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl DateUnit {
    pub fn lookup(name: &str) -> Option<DateUnit> {
        match name.to_ascii_lowercase().as_str() {
            "year" => Some(DateUnit::Year),
            "quarter" => Some(DateUnit::Quarter),
            "month" => Some(DateUnit::Month),
            "week" => Some(DateUnit::Week),
            "day" => Some(DateUnit::Day),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DateUnit::Year => "year",
            DateUnit::Quarter => "quarter",
            DateUnit::Month => "month",
            DateUnit::Week => "week",
            DateUnit::Day => "day",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(FieldRef),
    Literal(Literal),
    /// At least two operands, none of them an `And`.
    And(Vec<Expr>),
    /// At least two operands, none of them an `Or`.
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Box<Expr>,
        operator: CompareOperator,
        right: Box<Expr>,
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
    Arithmetic {
        left: Box<Expr>,
        operator: ArithmeticOperator,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    Aggregate {
        function: AggregateFunction,
        distinct: bool,
        /// `None` for `count(*)`.
        argument: Option<Box<Expr>>,
    },
    /// A scalar function, name in lower case.
    Function {
        name: String,
        args: Vec<Expr>,
    },
    DateTrunc {
        unit: DateUnit,
        expr: Box<Expr>,
    },
}

impl Expr {
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Field(_) | Expr::Literal(_) => vec![],
            Expr::And(items) | Expr::Or(items) => items.iter().collect(),
            Expr::Not(expr) | Expr::Negate(expr) => vec![expr],
            Expr::IsNull { expr, .. } | Expr::DateTrunc { expr, .. } => vec![expr],
            Expr::Compare { left, right, .. } | Expr::Arithmetic { left, right, .. } => {
                vec![left, right]
            }
            Expr::InList { expr, list, .. } => {
                let mut children: Vec<&Expr> = vec![expr];
                children.extend(list);
                children
            }
            Expr::Like { expr, pattern, .. } => vec![expr, pattern],
            Expr::Between {
                expr, low, high, ..
            } => vec![expr, low, high],
            Expr::Aggregate { argument, .. } => argument.iter().map(AsRef::as_ref).collect(),
            Expr::Function { args, .. } => args.iter().collect(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Field(_) | Expr::Literal(_) => vec![],
            Expr::And(items) | Expr::Or(items) => items.iter_mut().collect(),
            Expr::Not(expr) | Expr::Negate(expr) => vec![expr],
            Expr::IsNull { expr, .. } | Expr::DateTrunc { expr, .. } => vec![expr],
            Expr::Compare { left, right, .. } | Expr::Arithmetic { left, right, .. } => {
                vec![left, right]
            }
            Expr::InList { expr, list, .. } => {
                let mut children: Vec<&mut Expr> = vec![expr];
                children.extend(list);
                children
            }
            Expr::Like { expr, pattern, .. } => vec![expr, pattern],
            Expr::Between {
                expr, low, high, ..
            } => vec![expr, low, high],
            Expr::Aggregate { argument, .. } => argument.iter_mut().map(AsMut::as_mut).collect(),
            Expr::Function { args, .. } => args.iter_mut().collect(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate { .. })
    }

    pub fn contains_aggregate(&self) -> bool {
        self.is_aggregate() || self.children().into_iter().any(Expr::contains_aggregate)
    }

    /// Every field reference, in order of appearance.
    pub fn fields(&self) -> Vec<&FieldRef> {
        match self {
            Expr::Field(field) => vec![field],
            _ => self.children().into_iter().flat_map(Expr::fields).collect(),
        }
    }

    /// The operands of a top-level `AND`, or the expression itself.
    pub fn conjuncts(self) -> Vec<Expr> {
        match self {
            Expr::And(items) => items,
            expr => vec![expr],
        }
    }

    /// Combine conjuncts back into one expression.
    pub fn from_conjuncts(mut conjuncts: Vec<Expr>) -> Option<Expr> {
        match conjuncts.len() {
            0 => None,
            1 => conjuncts.pop(),
            _ => Some(Expr::And(conjuncts)),
        }
    }
}

/// The output name a query gets when it writes no `AS`.
///
/// Fields are named after the field, aggregates over a field after the function
/// and the field, `count(*)` is `count`; anything else is `expr_<position>`.
pub fn implicit_alias(expr: &Expr, position: usize) -> String {
    match expr {
        Expr::Field(field) => field.field.clone(),
        Expr::Aggregate {
            function,
            argument: None,
            ..
        } => function.name().to_string(),
        Expr::Aggregate {
            function,
            argument: Some(argument),
            ..
        } => match argument.as_ref() {
            Expr::Field(field) => format!("{}_{}", function.name(), field.field),
            _ => format!("expr_{position}"),
        },
        _ => format!("expr_{position}"),
    }
}

/// The first of `base`, `base_2`, `base_3`, ... not in `taken`.
pub fn unique_alias(base: &str, taken: &std::collections::BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
