//! Helpers for building sql::ast types in certain shapes and patterns.

use super::ast::*;

// Empty clauses //

/// An empty `WITH` clause.
pub fn empty_with() -> With {
    With {
        common_table_expressions: vec![],
    }
}

/// An empty `WHERE` clause.
pub fn empty_where() -> Where {
    Where(true_expr())
}

/// An empty `GROUP BY` clause.
pub fn empty_group_by() -> GroupBy {
    GroupBy { elements: vec![] }
}

/// An empty `HAVING` clause.
pub fn empty_having() -> Having {
    Having(true_expr())
}

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// An empty `LIMIT` clause.
pub fn empty_limit() -> Limit {
    Limit { limit: None }
}

/// A `true` expression.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// Combine expressions with `AND`, left to right. No expressions means `true`.
pub fn and_all(expressions: impl IntoIterator<Item = Expression>) -> Expression {
    expressions
        .into_iter()
        .reduce(|left, right| Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        })
        .unwrap_or_else(true_expr)
}

/// Combine expressions with `OR`, left to right. No expressions means `false`.
pub fn or_all(expressions: impl IntoIterator<Item = Expression>) -> Expression {
    expressions
        .into_iter()
        .reduce(|left, right| Expression::Or {
            left: Box::new(left),
            right: Box::new(right),
        })
        .unwrap_or(Expression::Value(Value::Bool(false)))
}

// Aliasing //

/// Generate a column expression refering to a specific table.
pub fn make_column(table: TableAlias, name: ColumnName, alias: ColumnAlias) -> (ColumnAlias, Expression) {
    (
        alias,
        Expression::ColumnReference(ColumnReference::TableColumn { table, name }),
    )
}

/// Create column aliases using this function so we build everything in one place.
pub fn make_column_alias(name: String) -> ColumnAlias {
    ColumnAlias { name }
}

/// Create table aliases using this function so we build everything in one place.
pub fn make_table_alias(name: String) -> TableAlias {
    TableAlias { name }
}

// SELECTs //

/// Build a simple select with a select list and the rest are empty.
pub fn simple_select(select_list: Vec<(ColumnAlias, Expression)>) -> Select {
    Select {
        distinct: false,
        select_list: SelectList::SelectList(select_list),
        from: None,
        joins: vec![],
        where_: empty_where(),
        group_by: empty_group_by(),
        having: empty_having(),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}

/// Build `SELECT * FROM (<set>) AS <alias>`, used to nest a set operation member
/// that carries its own ordering or limit.
pub fn select_star_from(set: SetExpression, alias: TableAlias) -> Select {
    Select {
        select_list: SelectList::SelectStar,
        from: Some(From::Select {
            select: Box::new(set),
            alias,
        }),
        ..simple_select(vec![])
    }
}
