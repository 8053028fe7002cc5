//! Lower a concrete syntax tree into the query tree.
//!
//! Building is purely structural. It never looks at a schema; it only checks
//! the invariants that can be decided from the query text alone.

use std::collections::BTreeSet;

use super::error::SemanticError;
use super::*;
use crate::syntax::cst;
use crate::syntax::{Parsed, Position};

/// Build the query tree of a parsed query.
pub fn build(parsed: &Parsed) -> Result<Query, SemanticError> {
    let mut names = BTreeSet::new();
    let mut blocks = Vec::with_capacity(parsed.query.blocks.len());
    for block in &parsed.query.blocks {
        if !names.insert(block.name.name.clone()) {
            return Err(SemanticError::DuplicateBlock {
                name: block.name.name.clone(),
                position: block.name.position,
            });
        }
        blocks.push(Block {
            name: block.name.name.clone(),
            body: build_set(&block.body)?,
        });
    }

    Ok(Query {
        description: parsed.description.clone(),
        blocks,
        body: build_set(&parsed.query.body)?,
    })
}

fn build_set(set: &cst::SetExpr) -> Result<SetExpr, SemanticError> {
    match set {
        cst::SetExpr::Select(select) => Ok(SetExpr::Select(Box::new(build_select(select)?))),
        cst::SetExpr::Operation {
            left,
            operator,
            right,
            position,
        } => {
            let left = build_set(left)?;
            let right = build_set(right)?;
            check_set_arity(&left, &right, *position)?;
            Ok(SetExpr::Compound {
                left: Box::new(left),
                operator: match operator {
                    cst::SetOperator::Union => SetOperator::Union,
                    cst::SetOperator::UnionAll => SetOperator::UnionAll,
                    cst::SetOperator::Intersect => SetOperator::Intersect,
                    cst::SetOperator::Except => SetOperator::Except,
                },
                right: Box::new(right),
            })
        }
    }
}

/// Star outputs expand against the schema, so their width is only known after
/// resolution; sides with a star are compared by the resolver instead.
fn check_set_arity(left: &SetExpr, right: &SetExpr, position: Position) -> Result<(), SemanticError> {
    let width = |select: &Select| {
        if select
            .outputs
            .iter()
            .any(|output| matches!(output, Output::All { .. }))
        {
            None
        } else {
            Some(select.outputs.len())
        }
    };
    match (width(left.first_select()), width(right.first_select())) {
        (Some(left), Some(right)) if left != right => Err(SemanticError::SetArityMismatch {
            left,
            right,
            position,
        }),
        _ => Ok(()),
    }
}

/// The clause an expression appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Filter,
    Output,
    Group,
    Having,
    Order,
}

struct Scope<'a> {
    aliases: &'a BTreeSet<String>,
    clause: Clause,
    in_aggregate: bool,
}

impl Scope<'_> {
    fn new(aliases: &BTreeSet<String>, clause: Clause) -> Scope<'_> {
        Scope {
            aliases,
            clause,
            in_aggregate: false,
        }
    }

    fn inside_aggregate(&self) -> Scope<'_> {
        Scope {
            aliases: self.aliases,
            clause: self.clause,
            in_aggregate: true,
        }
    }
}

fn build_select(select: &cst::Select) -> Result<Select, SemanticError> {
    let mut aliases = BTreeSet::new();
    let mut sources = Vec::with_capacity(select.sources.len());
    for source in &select.sources {
        let alias = source.alias.as_ref().unwrap_or(&source.entity);
        if !aliases.insert(alias.name.clone()) {
            return Err(SemanticError::DuplicateSourceAlias {
                alias: alias.name.clone(),
                position: alias.position,
            });
        }
        sources.push(Source {
            entity: source.entity.name.clone(),
            alias: alias.name.clone(),
            optional: source.optional,
        });
    }

    let filter = select
        .filter
        .as_ref()
        .map(|filter| build_expr(filter, &Scope::new(&aliases, Clause::Filter)))
        .transpose()?;

    let outputs = build_outputs(&select.outputs, &Scope::new(&aliases, Clause::Output))?;

    let group = select
        .group
        .iter()
        .map(|expr| build_expr(expr, &Scope::new(&aliases, Clause::Group)))
        .collect::<Result<Vec<_>, _>>()?;

    let having = match &select.having {
        None => None,
        Some(having) if group.is_empty() => {
            return Err(SemanticError::HavingWithoutGroup(having.position))
        }
        Some(having) => Some(build_expr(&having.condition, &Scope::new(&aliases, Clause::Having))?),
    };

    let order = select
        .order
        .iter()
        .map(|ordering| {
            Ok(Ordering {
                expr: build_expr(&ordering.expr, &Scope::new(&aliases, Clause::Order))?,
                direction: match ordering.direction {
                    Some(cst::Direction::Desc) => Direction::Desc,
                    Some(cst::Direction::Asc) | None => Direction::Asc,
                },
            })
        })
        .collect::<Result<Vec<_>, SemanticError>>()?;

    Ok(Select {
        sources,
        filter,
        distinct: select.distinct,
        outputs,
        group,
        having,
        order,
        limit: select.limit,
        plan: None,
    })
}

/// Build the outputs and name the ones written without `AS`.
///
/// Explicit aliases are reserved first, so an implicit alias never takes a
/// name the query spells out; clashes get `_2`, `_3`, ... appended.
fn build_outputs(outputs: &[cst::Output], scope: &Scope) -> Result<Vec<Output>, SemanticError> {
    let mut taken = BTreeSet::new();
    for output in outputs {
        if let cst::Output::Expr {
            alias: Some(alias), ..
        } = output
        {
            if !taken.insert(alias.name.clone()) {
                return Err(SemanticError::DuplicateOutputAlias {
                    alias: alias.name.clone(),
                    position: alias.position,
                });
            }
        }
    }

    let mut built = Vec::with_capacity(outputs.len());
    for (index, output) in outputs.iter().enumerate() {
        match output {
            cst::Output::Star { source } => {
                check_alias(source, scope)?;
                built.push(Output::All {
                    source: source.name.clone(),
                });
            }
            cst::Output::Expr { expr, alias } => {
                let expr = build_expr(expr, scope)?;
                let alias = match alias {
                    Some(alias) => alias.name.clone(),
                    None => {
                        let alias = unique_alias(&implicit_alias(&expr, index + 1), &taken);
                        taken.insert(alias.clone());
                        alias
                    }
                };
                built.push(Output::Expr { expr, alias });
            }
        }
    }
    Ok(built)
}

fn check_alias(alias: &cst::Ident, scope: &Scope) -> Result<(), SemanticError> {
    if scope.aliases.contains(&alias.name) {
        Ok(())
    } else {
        Err(SemanticError::UnknownAlias {
            alias: alias.name.clone(),
            position: alias.position,
        })
    }
}

fn build_expr(expr: &cst::Expr, scope: &Scope) -> Result<Expr, SemanticError> {
    match expr {
        cst::Expr::Binary {
            left,
            operator,
            right,
        } => {
            let left = build_expr(left, scope)?;
            let right = build_expr(right, scope)?;
            Ok(build_binary(left, *operator, right))
        }
        cst::Expr::Not { expr, .. } => Ok(Expr::Not(Box::new(build_expr(expr, scope)?))),
        cst::Expr::Negate { expr, position } => build_negate(expr, *position, scope),
        cst::Expr::IsNull { expr, negated } => Ok(Expr::IsNull {
            expr: Box::new(build_expr(expr, scope)?),
            negated: *negated,
        }),
        cst::Expr::InList {
            expr,
            list,
            negated,
        } => Ok(Expr::InList {
            expr: Box::new(build_expr(expr, scope)?),
            list: list
                .iter()
                .map(|item| build_expr(item, scope))
                .collect::<Result<_, _>>()?,
            negated: *negated,
        }),
        cst::Expr::Like {
            expr,
            pattern,
            negated,
        } => Ok(Expr::Like {
            expr: Box::new(build_expr(expr, scope)?),
            pattern: Box::new(build_expr(pattern, scope)?),
            negated: *negated,
        }),
        cst::Expr::Between {
            expr,
            low,
            high,
            negated,
        } => Ok(Expr::Between {
            expr: Box::new(build_expr(expr, scope)?),
            low: Box::new(build_expr(low, scope)?),
            high: Box::new(build_expr(high, scope)?),
            negated: *negated,
        }),
        cst::Expr::Field { qualifier, name } => {
            if let Some(qualifier) = qualifier {
                check_alias(qualifier, scope)?;
            }
            Ok(Expr::Field(FieldRef::new(
                qualifier.as_ref().map(|qualifier| qualifier.name.as_str()),
                &name.name,
            )))
        }
        cst::Expr::Literal { value, position } => build_literal(value, *position).map(Expr::Literal),
        cst::Expr::Call {
            name,
            distinct,
            arguments,
        } => build_call(name, *distinct, arguments, scope),
        cst::Expr::Paren { expr, .. } => build_expr(expr, scope),
    }
}

fn build_binary(left: Expr, operator: cst::BinaryOperator, right: Expr) -> Expr {
    match operator {
        cst::BinaryOperator::Or => Expr::Or(flatten(left, right, |expr| match expr {
            Expr::Or(items) => Ok(items),
            expr => Err(expr),
        })),
        cst::BinaryOperator::And => Expr::And(flatten(left, right, |expr| match expr {
            Expr::And(items) => Ok(items),
            expr => Err(expr),
        })),
        cst::BinaryOperator::Equals => compare(left, CompareOperator::Equals, right),
        cst::BinaryOperator::NotEquals => compare(left, CompareOperator::NotEquals, right),
        cst::BinaryOperator::LessThan => compare(left, CompareOperator::LessThan, right),
        cst::BinaryOperator::LessThanOrEqualTo => {
            compare(left, CompareOperator::LessThanOrEqualTo, right)
        }
        cst::BinaryOperator::GreaterThan => compare(left, CompareOperator::GreaterThan, right),
        cst::BinaryOperator::GreaterThanOrEqualTo => {
            compare(left, CompareOperator::GreaterThanOrEqualTo, right)
        }
        cst::BinaryOperator::Add => arithmetic(left, ArithmeticOperator::Add, right),
        cst::BinaryOperator::Subtract => arithmetic(left, ArithmeticOperator::Subtract, right),
        cst::BinaryOperator::Multiply => arithmetic(left, ArithmeticOperator::Multiply, right),
        cst::BinaryOperator::Divide => arithmetic(left, ArithmeticOperator::Divide, right),
        cst::BinaryOperator::Modulo => arithmetic(left, ArithmeticOperator::Modulo, right),
        cst::BinaryOperator::Concat => arithmetic(left, ArithmeticOperator::Concat, right),
    }
}

fn compare(left: Expr, operator: CompareOperator, right: Expr) -> Expr {
    Expr::Compare {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

fn arithmetic(left: Expr, operator: ArithmeticOperator, right: Expr) -> Expr {
    Expr::Arithmetic {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

/// Operands of an n-ary `AND`/`OR`, splicing in nested nodes of the same kind.
fn flatten(left: Expr, right: Expr, split: impl Fn(Expr) -> Result<Vec<Expr>, Expr>) -> Vec<Expr> {
    let mut items = vec![];
    for operand in [left, right] {
        match split(operand) {
            Ok(nested) => items.extend(nested),
            Err(operand) => items.push(operand),
        }
    }
    items
}

fn build_negate(expr: &cst::Expr, position: Position, scope: &Scope) -> Result<Expr, SemanticError> {
    // `-9223372036854775808` only fits once the sign is attached.
    if let cst::Expr::Literal {
        value: cst::Literal::Integer(digits),
        ..
    } = expr
    {
        let negative = format!("-{digits}");
        return negative
            .parse::<i64>()
            .map(|value| Expr::Literal(Literal::Integer(value)))
            .map_err(|_| SemanticError::IntegerOutOfRange {
                digits: negative,
                position,
            });
    }

    match build_expr(expr, scope)? {
        Expr::Literal(Literal::Integer(value)) => value
            .checked_neg()
            .map(|value| Expr::Literal(Literal::Integer(value)))
            .ok_or_else(|| SemanticError::IntegerOutOfRange {
                digits: format!("-({value})"),
                position,
            }),
        Expr::Literal(Literal::Decimal(digits)) => {
            Ok(Expr::Literal(Literal::Decimal(match digits.strip_prefix('-') {
                Some(positive) => positive.to_string(),
                None => format!("-{digits}"),
            })))
        }
        expr => Ok(Expr::Negate(Box::new(expr))),
    }
}

fn build_literal(value: &cst::Literal, position: Position) -> Result<Literal, SemanticError> {
    Ok(match value {
        cst::Literal::Integer(digits) => Literal::Integer(digits.parse::<i64>().map_err(|_| {
            SemanticError::IntegerOutOfRange {
                digits: digits.clone(),
                position,
            }
        })?),
        cst::Literal::Decimal(digits) => Literal::Decimal(digits.clone()),
        cst::Literal::String(value) => Literal::String(value.clone()),
        cst::Literal::Date(value) => {
            if !is_calendar_date(value) {
                return Err(SemanticError::InvalidDate {
                    value: value.clone(),
                    position,
                });
            }
            Literal::Date(value.clone())
        }
        cst::Literal::Boolean(value) => Literal::Boolean(*value),
        cst::Literal::Null => Literal::Null,
    })
}

/// `YYYY-MM-DD` with a month of 1-12 and a day of 1-31.
fn is_calendar_date(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    let number = |part: &str, digits: usize| {
        if part.len() == digits && part.bytes().all(|byte| byte.is_ascii_digit()) {
            part.parse::<u32>().ok()
        } else {
            None
        }
    };
    match parts.as_slice() {
        [year, month, day] => {
            number(year, 4).is_some()
                && number(month, 2).is_some_and(|month| (1..=12).contains(&month))
                && number(day, 2).is_some_and(|day| (1..=31).contains(&day))
        }
        _ => false,
    }
}

fn build_call(
    name: &cst::Ident,
    distinct: bool,
    arguments: &cst::Arguments,
    scope: &Scope,
) -> Result<Expr, SemanticError> {
    let function = name.name.to_ascii_lowercase();
    let position = name.position;

    if let Some(aggregate) = AggregateFunction::lookup(&function) {
        let misplaced = match (scope.in_aggregate, scope.clause) {
            (true, _) => Some(SemanticError::NestedAggregate {
                name: function.clone(),
                position,
            }),
            (false, Clause::Filter) => Some(SemanticError::AggregateInFilter {
                name: function.clone(),
                position,
            }),
            (false, Clause::Group) => Some(SemanticError::AggregateInGroup {
                name: function.clone(),
                position,
            }),
            (false, Clause::Output | Clause::Having | Clause::Order) => None,
        };
        if let Some(error) = misplaced {
            return Err(error);
        }

        return match arguments {
            cst::Arguments::Star if aggregate == AggregateFunction::Count => Ok(Expr::Aggregate {
                function: aggregate,
                distinct: false,
                argument: None,
            }),
            cst::Arguments::Star => Err(SemanticError::StarArgument { position }),
            cst::Arguments::List(args) => match args.as_slice() {
                [argument] => Ok(Expr::Aggregate {
                    function: aggregate,
                    distinct,
                    argument: Some(Box::new(build_expr(argument, &scope.inside_aggregate())?)),
                }),
                _ => Err(SemanticError::AggregateArity {
                    name: function,
                    position,
                }),
            },
        };
    }

    if distinct {
        return Err(SemanticError::DistinctArgument { position });
    }
    let args = match arguments {
        cst::Arguments::Star => return Err(SemanticError::StarArgument { position }),
        cst::Arguments::List(args) => args,
    };

    if function == "trunc" {
        return match args.as_slice() {
            [unit, expr] => Ok(Expr::DateTrunc {
                unit: date_unit(unit)?,
                expr: Box::new(build_expr(expr, scope)?),
            }),
            _ => Err(SemanticError::TruncArity { position }),
        };
    }

    Ok(Expr::Function {
        name: function,
        args: args
            .iter()
            .map(|arg| build_expr(arg, scope))
            .collect::<Result<_, _>>()?,
    })
}

/// The unit of `trunc` is written as a bare word or a string.
fn date_unit(unit: &cst::Expr) -> Result<DateUnit, SemanticError> {
    let (text, position) = match unit {
        cst::Expr::Field {
            qualifier: None,
            name,
        } => (name.name.clone(), name.position),
        cst::Expr::Literal {
            value: cst::Literal::String(text),
            position,
        } => (text.clone(), *position),
        other => ("(expression)".to_string(), other.position()),
    };
    DateUnit::lookup(&text).ok_or(SemanticError::InvalidTruncUnit {
        unit: text,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn build_text(text: &str) -> Result<Query, SemanticError> {
        build(&parse(text).unwrap())
    }

    fn build_select(text: &str) -> Select {
        match build_text(text).unwrap().body {
            SetExpr::Select(select) => *select,
            SetExpr::Compound { .. } => panic!("expected a single select"),
        }
    }

    fn field(source: &str, name: &str) -> Expr {
        Expr::Field(FieldRef::new(Some(source), name))
    }

    fn integer(value: i64) -> Expr {
        Expr::Literal(Literal::Integer(value))
    }

    #[test]
    fn names_outputs_without_an_alias() {
        let select = build_select(
            "FIND orders o, customers FETCH o.order_id, count(*), sum(o.freight), o.freight * 2, customers.company_name AS name",
        );
        assert_eq!(
            select.output_aliases(),
            vec!["order_id", "count", "sum_freight", "expr_4", "name"]
        );
        assert_eq!(select.sources[1].alias, "customers");
    }

    #[test]
    fn implicit_aliases_avoid_explicit_ones() {
        let select = build_select(
            "FIND orders o, customers c FETCH o.customer_id, c.customer_id, o.order_id AS customer_id_2",
        );
        assert_eq!(
            select.output_aliases(),
            vec!["customer_id", "customer_id_3", "customer_id_2"]
        );
    }

    #[test]
    fn flattens_nested_conjunctions() {
        let select = build_select(
            "FIND a FILTER (a.x = 1 AND (a.y = 2 AND a.z = 3)) OR a.w = 4 OR (a.v = 5) FETCH a.x",
        );
        let Some(Expr::Or(items)) = select.filter else {
            panic!("expected a disjunction");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], Expr::And(conjuncts) if conjuncts.len() == 3));
    }

    #[test]
    fn folds_negative_literals() {
        let select = build_select(
            "FIND a FETCH -5 AS i, -(2.5) AS d, - -3 AS twice, -a.x AS field, -9223372036854775808 AS min",
        );
        let exprs: Vec<Expr> = select
            .outputs
            .into_iter()
            .map(|output| match output {
                Output::Expr { expr, .. } => expr,
                Output::All { .. } => panic!("unexpected star"),
            })
            .collect();
        similar_asserts::assert_eq!(
            exprs,
            vec![
                integer(-5),
                Expr::Literal(Literal::Decimal("-2.5".to_string())),
                integer(3),
                Expr::Negate(Box::new(field("a", "x"))),
                integer(i64::MIN),
            ]
        );
    }

    #[test]
    fn lowers_trunc_and_function_names() {
        let select = build_select("FIND o FETCH TRUNC(Month, o.order_date) AS m, UPPER(o.name) AS u");
        let Output::Expr { expr, .. } = &select.outputs[0] else {
            panic!("expected an expression");
        };
        assert_eq!(
            expr,
            &Expr::DateTrunc {
                unit: DateUnit::Month,
                expr: Box::new(field("o", "order_date")),
            }
        );
        let Output::Expr { expr, .. } = &select.outputs[1] else {
            panic!("expected an expression");
        };
        assert!(matches!(expr, Expr::Function { name, .. } if name == "upper"));
    }

    #[test]
    fn keeps_the_description() {
        let query = build_text("# Monthly orders\nFIND orders FETCH orders.order_id").unwrap();
        assert_eq!(query.description.as_deref(), Some("Monthly orders"));
    }

    #[test]
    fn rejects_structural_errors() {
        let cases = [
            ("FIND o FETCH o.x HAVING count(*) > 1", "HavingWithoutGroup"),
            ("FIND o FILTER count(*) > 1 FETCH o.x", "AggregateInFilter"),
            ("FIND o FETCH o.x GROUP sum(o.y)", "AggregateInGroup"),
            ("FIND o FETCH sum(max(o.y))", "NestedAggregate"),
            ("FIND orders o, customers o FETCH o.x", "DuplicateSourceAlias"),
            ("FIND o FETCH o.x AS a, o.y AS a", "DuplicateOutputAlias"),
            (
                "WITH b AS (FIND o FETCH o.x) WITH b AS (FIND o FETCH o.x) FIND b FETCH b.x",
                "DuplicateBlock",
            ),
            ("FIND orders o FETCH c.x", "UnknownAlias"),
            ("FIND orders o FETCH c.*", "UnknownAlias"),
            ("FIND o FETCH sum(*)", "StarArgument"),
            ("FIND o FETCH upper(DISTINCT o.x)", "DistinctArgument"),
            ("FIND o FETCH sum(o.x, o.y)", "AggregateArity"),
            ("FIND o FETCH trunc(decade, o.d)", "InvalidTruncUnit"),
            ("FIND o FETCH trunc(o.d)", "TruncArity"),
            (
                "FIND o FETCH o.x UNION FIND c FETCH c.x, c.y",
                "SetArityMismatch",
            ),
            ("FIND o FETCH 99999999999999999999", "IntegerOutOfRange"),
            ("FIND o FILTER o.d = DATE '2023-13-01' FETCH o.x", "InvalidDate"),
        ];
        for (text, expected) in cases {
            let error = build_text(text).unwrap_err();
            assert!(
                format!("{error:?}").starts_with(expected),
                "{text}: expected {expected}, got {error:?}"
            );
        }
    }

    #[test]
    fn star_outputs_skip_the_arity_check() {
        assert!(build_text("FIND o FETCH o.* UNION FIND c FETCH c.x, c.y").is_ok());
    }
}
