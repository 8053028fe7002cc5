//! Print a query tree back as canonical EQL.
//!
//! Keywords are upper case, each clause starts a new line and parentheses
//! appear only where precedence needs them, so that building the printed text
//! gives back the tree that was printed.

use crate::ast::*;
use crate::syntax::lexer::Keyword;

/// Canonical EQL text of a query.
pub fn format(query: &Query) -> String {
    let mut lines = vec![];
    if let Some(description) = &query.description {
        for line in description.split('\n') {
            if line.is_empty() {
                lines.push("#".to_string());
            } else {
                lines.push(format!("# {line}"));
            }
        }
    }
    for block in &query.blocks {
        lines.push(format!("WITH {} AS (", identifier(&block.name)));
        lines.extend(set_lines(&block.body).into_iter().map(|line| format!("  {line}")));
        lines.push(")".to_string());
    }
    lines.extend(set_lines(&query.body));
    lines.join("\n")
}

/// Print a single expression.
pub fn format_expr(expr: &Expr) -> String {
    expression(expr, Precedence::Or)
}

fn set_lines(set: &SetExpr) -> Vec<String> {
    match set {
        SetExpr::Select(select) => select_lines(select),
        SetExpr::Compound {
            left,
            operator,
            right,
        } => {
            let mut lines = set_lines(left);
            lines.push(
                match operator {
                    SetOperator::Union => "UNION",
                    SetOperator::UnionAll => "UNION ALL",
                    SetOperator::Intersect => "INTERSECT",
                    SetOperator::Except => "EXCEPT",
                }
                .to_string(),
            );
            lines.extend(set_lines(right));
            lines
        }
    }
}

fn select_lines(select: &Select) -> Vec<String> {
    let mut lines = vec![format!(
        "FIND {}",
        comma_separated(select.sources.iter().map(source))
    )];
    if let Some(filter) = &select.filter {
        lines.push(format!("FILTER {}", format_expr(filter)));
    }
    lines.push(format!(
        "FETCH {}{}",
        if select.distinct { "DISTINCT " } else { "" },
        comma_separated(
            select
                .outputs
                .iter()
                .enumerate()
                .map(|(index, output)| self::output(output, index + 1))
        )
    ));
    if !select.group.is_empty() {
        lines.push(format!(
            "GROUP {}",
            comma_separated(select.group.iter().map(format_expr))
        ));
    }
    if let Some(having) = &select.having {
        lines.push(format!("HAVING {}", format_expr(having)));
    }
    if !select.order.is_empty() {
        lines.push(format!(
            "ORDER {}",
            comma_separated(select.order.iter().map(|ordering| match ordering.direction {
                Direction::Asc => format_expr(&ordering.expr),
                Direction::Desc => format!("{} DESC", format_expr(&ordering.expr)),
            }))
        ));
    }
    if let Some(limit) = select.limit {
        lines.push(format!("LIMIT {limit}"));
    }
    lines
}

fn source(source: &Source) -> String {
    let mut text = String::new();
    if source.optional {
        text.push_str("OPTIONAL ");
    }
    text.push_str(&identifier(&source.entity));
    if source.alias != source.entity {
        text.push(' ');
        text.push_str(&identifier(&source.alias));
    }
    text
}

fn output(output: &Output, position: usize) -> String {
    match output {
        Output::All { source } => format!("{}.*", identifier(source)),
        Output::Expr { expr, alias } if *alias == implicit_alias(expr, position) => {
            format_expr(expr)
        }
        Output::Expr { expr, alias } => format!("{} AS {}", format_expr(expr), identifier(alias)),
    }
}

fn comma_separated(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

/// An identifier, quoted when it would not read back as the same name.
fn identifier(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if simple && Keyword::lookup(name).is_none() {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Binding strength, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Or,
    And,
    Not,
    Predicate,
    Additive,
    Multiplicative,
    Unary,
    Atom,
}

fn precedence(expr: &Expr) -> Precedence {
    match expr {
        Expr::Or(_) => Precedence::Or,
        Expr::And(_) => Precedence::And,
        Expr::Not(_) => Precedence::Not,
        Expr::Compare { .. }
        | Expr::IsNull { .. }
        | Expr::InList { .. }
        | Expr::Like { .. }
        | Expr::Between { .. } => Precedence::Predicate,
        Expr::Arithmetic { operator, .. } if operator.is_multiplicative() => {
            Precedence::Multiplicative
        }
        Expr::Arithmetic { .. } => Precedence::Additive,
        Expr::Negate(_) => Precedence::Unary,
        Expr::Field(_)
        | Expr::Literal(_)
        | Expr::Aggregate { .. }
        | Expr::Function { .. }
        | Expr::DateTrunc { .. } => Precedence::Atom,
    }
}

/// Print `expr` where the grammar expects at least `minimum`.
fn expression(expr: &Expr, minimum: Precedence) -> String {
    let text = bare_expression(expr);
    if precedence(expr) < minimum {
        format!("({text})")
    } else {
        text
    }
}

fn bare_expression(expr: &Expr) -> String {
    match expr {
        Expr::Field(field) => match &field.source {
            Some(source) => format!("{}.{}", identifier(source), identifier(&field.field)),
            None => identifier(&field.field),
        },
        Expr::Literal(value) => literal(value),
        Expr::Or(items) => items
            .iter()
            .map(|item| expression(item, Precedence::And))
            .collect::<Vec<_>>()
            .join(" OR "),
        Expr::And(items) => items
            .iter()
            .map(|item| expression(item, Precedence::Not))
            .collect::<Vec<_>>()
            .join(" AND "),
        Expr::Not(expr) => format!("NOT {}", expression(expr, Precedence::Not)),
        Expr::Compare {
            left,
            operator,
            right,
        } => format!(
            "{} {} {}",
            expression(left, Precedence::Additive),
            operator.symbol(),
            expression(right, Precedence::Additive)
        ),
        Expr::IsNull { expr, negated } => format!(
            "{} IS {}NULL",
            expression(expr, Precedence::Additive),
            not(*negated)
        ),
        Expr::InList {
            expr,
            list,
            negated,
        } => format!(
            "{} {}IN ({})",
            expression(expr, Precedence::Additive),
            not(*negated),
            comma_separated(list.iter().map(format_expr))
        ),
        Expr::Like {
            expr,
            pattern,
            negated,
        } => format!(
            "{} {}LIKE {}",
            expression(expr, Precedence::Additive),
            not(*negated),
            expression(pattern, Precedence::Additive)
        ),
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => format!(
            "{} {}BETWEEN {} AND {}",
            expression(expr, Precedence::Additive),
            not(*negated),
            expression(low, Precedence::Additive),
            expression(high, Precedence::Additive)
        ),
        Expr::Arithmetic {
            left,
            operator,
            right,
        } => {
            let (left_minimum, right_minimum) = if operator.is_multiplicative() {
                (Precedence::Multiplicative, Precedence::Unary)
            } else {
                (Precedence::Additive, Precedence::Multiplicative)
            };
            format!(
                "{} {} {}",
                expression(left, left_minimum),
                operator.symbol(),
                expression(right, right_minimum)
            )
        }
        Expr::Negate(operand) => {
            // `--` would start a comment
            let starts_with_minus = matches!(
                operand.as_ref(),
                Expr::Negate(_)
                    | Expr::Literal(Literal::Integer(i64::MIN..=-1))
            ) || matches!(operand.as_ref(), Expr::Literal(Literal::Decimal(digits)) if digits.starts_with('-'));
            if starts_with_minus {
                format!("-({})", bare_expression(operand))
            } else {
                format!("-{}", expression(operand, Precedence::Unary))
            }
        }
        Expr::Aggregate {
            function,
            distinct,
            argument,
        } => match argument {
            None => format!("{}(*)", function.name()),
            Some(argument) => format!(
                "{}({}{})",
                function.name(),
                if *distinct { "DISTINCT " } else { "" },
                format_expr(argument)
            ),
        },
        Expr::Function { name, args } => format!(
            "{}({})",
            identifier(name),
            comma_separated(args.iter().map(format_expr))
        ),
        Expr::DateTrunc { unit, expr } => format!("trunc({}, {})", unit.name(), format_expr(expr)),
    }
}

fn not(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

fn literal(value: &Literal) -> String {
    match value {
        Literal::Integer(value) => value.to_string(),
        Literal::Decimal(digits) => digits.clone(),
        Literal::String(value) => format!("'{}'", value.replace('\'', "''")),
        Literal::Date(value) => format!("DATE '{value}'"),
        Literal::Boolean(true) => "TRUE".to_string(),
        Literal::Boolean(false) => "FALSE".to_string(),
        Literal::Null => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn reformat(text: &str) -> String {
        format(&build(&parse(text).unwrap()).unwrap())
    }

    #[test]
    fn formats_every_clause() {
        insta::assert_snapshot!(
            reformat("# Orders per customer\nfind orders o, optional customers c filter o.freight > 10 and (c.country = 'UK' or c.country = 'USA') fetch distinct c.company_name, count(*) group c.company_name having count(*) > 2 order count desc, c.company_name asc limit 5"),
            @r###"
        # Orders per customer
        FIND orders o, OPTIONAL customers c
        FILTER o.freight > 10 AND (c.country = 'UK' OR c.country = 'USA')
        FETCH DISTINCT c.company_name, count(*)
        GROUP c.company_name
        HAVING count(*) > 2
        ORDER count DESC, c.company_name
        LIMIT 5
        "###
        );
    }

    #[test]
    fn prints_only_the_parentheses_precedence_needs() {
        insta::assert_snapshot!(
            reformat("FIND a FETCH ((a.x + a.y)) * a.z AS p, a.x - (a.y - a.z) AS q, (a.x - a.y) - a.z AS r, -(a.x + 1) AS s, - -a.x AS t, NOT (a.b AND a.c) AS u, a.x * -2 AS v"),
            @"FIND a\nFETCH (a.x + a.y) * a.z AS p, a.x - (a.y - a.z) AS q, a.x - a.y - a.z AS r, -(a.x + 1) AS s, -(-a.x) AS t, NOT (a.b AND a.c) AS u, a.x * -2 AS v"
        );
    }

    #[test]
    fn prints_blocks_and_set_operations() {
        insta::assert_snapshot!(
            reformat("with top as (find orders o fetch o.customer_id order o.freight desc limit 3) find top t, customers c fetch c.company_name union all find suppliers s fetch s.company_name"),
            @r###"
        WITH top AS (
          FIND orders o
          FETCH o.customer_id
          ORDER o.freight DESC
          LIMIT 3
        )
        FIND top t, customers c
        FETCH c.company_name
        UNION ALL
        FIND suppliers s
        FETCH s.company_name
        "###
        );
    }

    #[test]
    fn quotes_identifiers_that_need_it() {
        insta::assert_snapshot!(
            reformat(r#"FIND "order" FETCH "order"."group", "order"."my field" AS "Total Price", trunc(week, "order".placed) AS week"#),
            @r###"
        FIND "order"
        FETCH "order"."group", "order"."my field" AS "Total Price", trunc(week, "order".placed) AS week
        "###
        );
    }

    #[test]
    fn prints_predicates_and_literals() {
        insta::assert_snapshot!(
            reformat("FIND p FILTER p.name NOT LIKE 'O''Brien%' AND p.id NOT IN (1, 2) AND p.price NOT BETWEEN 1.5 AND -2.5 AND p.d >= DATE '2023-01-01' AND p.discontinued IS NOT NULL AND NOT p.active = TRUE FETCH p.id"),
            @"FIND p\nFILTER p.name NOT LIKE 'O''Brien%' AND p.id NOT IN (1, 2) AND p.price NOT BETWEEN 1.5 AND -2.5 AND p.d >= DATE '2023-01-01' AND p.discontinued IS NOT NULL AND NOT p.active = TRUE\nFETCH p.id"
        );
    }
}
