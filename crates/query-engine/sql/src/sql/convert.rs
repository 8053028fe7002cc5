//! Convert a SQL AST to a low-level SQL string.

use super::ast::*;
use super::dialect::Dialect;
use super::helpers;
use super::string::SQL;

// Convert to SQL strings

impl Query {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.with.to_sql(sql);
        self.body.to_sql(sql);
    }
}

impl With {
    pub fn to_sql(&self, sql: &mut SQL) {
        if self.common_table_expressions.is_empty() {
            return;
        }
        sql.append_syntax("WITH ");

        let ctes = &self.common_table_expressions;
        for (index, cte) in ctes.iter().enumerate() {
            cte.to_sql(sql);
            if index < (ctes.len() - 1) {
                sql.append_syntax(", ");
            }
        }
        sql.append_syntax(" ");
    }
}

impl CommonTableExpression {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.alias.to_sql(sql);
        sql.append_syntax(" AS (");
        self.select.to_sql(sql);
        sql.append_syntax(")");
    }
}

impl SetExpression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            SetExpression::Select(select) => select.to_sql(sql),
            SetExpression::Compound {
                left,
                operator,
                right,
            } => {
                left.to_sql(sql);
                operator.to_sql(sql);
                right.to_sql(sql);
            }
        }
    }
}

impl SetOperator {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            SetOperator::Union => sql.append_syntax(" UNION "),
            SetOperator::UnionAll => sql.append_syntax(" UNION ALL "),
            SetOperator::Intersect => sql.append_syntax(" INTERSECT "),
            SetOperator::Except => sql.append_syntax(" EXCEPT "),
        }
    }
}

impl Select {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("SELECT ");
        if self.distinct {
            sql.append_syntax("DISTINCT ");
        }

        self.select_list.to_sql(sql);

        if let Some(from) = &self.from {
            sql.append_syntax(" ");
            from.to_sql(sql);
        }

        for join in &self.joins {
            join.to_sql(sql);
        }

        self.where_.to_sql(sql);
        self.group_by.to_sql(sql);
        self.having.to_sql(sql);
        self.order_by.to_sql(sql);
        self.limit.to_sql(sql);
    }
}

impl SelectList {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            SelectList::SelectList(select_list) => {
                for (index, (col, expr)) in select_list.iter().enumerate() {
                    expr.to_sql(sql);
                    sql.append_syntax(" AS ");
                    col.to_sql(sql);
                    if index < (select_list.len() - 1) {
                        sql.append_syntax(", ");
                    }
                }
            }
            SelectList::SelectStar => sql.append_syntax("*"),
        }
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("FROM ");
        match &self {
            From::Table { reference, alias } => {
                reference.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }
            From::Select { select, alias } => {
                sql.append_syntax("(");
                select.to_sql(sql);
                sql.append_syntax(")");
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }
        }
    }
}

impl Join {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Join::LeftOuterJoin(LeftOuterJoin {
                reference,
                alias,
                on,
            }) => {
                sql.append_syntax(" LEFT OUTER JOIN ");
                reference.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
                sql.append_syntax(" ON ");
                on.to_sql(sql);
            }
            Join::InnerJoin(InnerJoin {
                reference,
                alias,
                on,
            }) => {
                sql.append_syntax(" INNER JOIN ");
                reference.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
                sql.append_syntax(" ON ");
                on.to_sql(sql);
            }
            Join::CrossJoin(CrossJoin { reference, alias }) => {
                sql.append_syntax(" CROSS JOIN ");
                reference.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }
        }
    }
}

impl Where {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Where(expression) = self;
        if *expression != helpers::true_expr() {
            sql.append_syntax(" WHERE ");
            expression.to_sql(sql);
        }
    }
}

impl GroupBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if self.elements.is_empty() {
            return;
        }
        sql.append_syntax(" GROUP BY ");
        for (index, element) in self.elements.iter().enumerate() {
            element.to_sql(sql);
            if index < (self.elements.len() - 1) {
                sql.append_syntax(", ");
            }
        }
    }
}

impl Having {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Having(expression) = self;
        if *expression != helpers::true_expr() {
            sql.append_syntax(" HAVING ");
            expression.to_sql(sql);
        }
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if self.elements.is_empty() {
            return;
        }
        sql.append_syntax(" ORDER BY ");
        for (index, order_by_item) in self.elements.iter().enumerate() {
            order_by_item.to_sql(sql);
            if index < (self.elements.len() - 1) {
                sql.append_syntax(", ");
            }
        }
    }
}

impl OrderByElement {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.target.to_sql(sql);
        self.direction.to_sql(sql);
    }
}

impl OrderByDirection {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            OrderByDirection::Asc => sql.append_syntax(" ASC"),
            OrderByDirection::Desc => sql.append_syntax(" DESC"),
        }
    }
}

impl Limit {
    pub fn to_sql(&self, sql: &mut SQL) {
        if let Some(limit) = self.limit {
            sql.append_syntax(" LIMIT ");
            sql.append_syntax(&limit.to_string());
        }
    }
}

// scalars
impl Expression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Expression::ColumnReference(column_reference) => column_reference.to_sql(sql),
            Expression::Value(value) => value.to_sql(sql),
            Expression::And { left, right } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                sql.append_syntax(" AND ");
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Or { left, right } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                sql.append_syntax(" OR ");
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Not(expr) => {
                sql.append_syntax("NOT ");
                expr.to_sql(sql);
            }
            Expression::BinaryOperation {
                left,
                operator,
                right,
            } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                operator.to_sql(sql);
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::BinaryArrayOperation {
                left,
                operator,
                right,
            } => {
                sql.append_syntax("(");
                {
                    left.to_sql(sql);
                    operator.to_sql(sql);
                    sql.append_syntax("(");
                    for (index, item) in right.iter().enumerate() {
                        item.to_sql(sql);
                        if index < (right.len() - 1) {
                            sql.append_syntax(", ");
                        }
                    }
                    sql.append_syntax(")");
                }
                sql.append_syntax(")");
            }
            Expression::UnaryOperation {
                expression,
                operator,
            } => match operator {
                UnaryOperator::Negate => {
                    sql.append_syntax("-(");
                    expression.to_sql(sql);
                    sql.append_syntax(")");
                }
                UnaryOperator::IsNull => {
                    sql.append_syntax("(");
                    expression.to_sql(sql);
                    sql.append_syntax(" IS NULL)");
                }
                UnaryOperator::IsNotNull => {
                    sql.append_syntax("(");
                    expression.to_sql(sql);
                    sql.append_syntax(" IS NOT NULL)");
                }
            },
            Expression::Between {
                expression,
                low,
                high,
                negated,
            } => {
                sql.append_syntax("(");
                expression.to_sql(sql);
                if *negated {
                    sql.append_syntax(" NOT BETWEEN ");
                } else {
                    sql.append_syntax(" BETWEEN ");
                }
                low.to_sql(sql);
                sql.append_syntax(" AND ");
                high.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::FunctionCall { function, args } => {
                function.to_sql(sql);
                sql.append_syntax("(");
                for (index, arg) in args.iter().enumerate() {
                    arg.to_sql(sql);
                    if index < (args.len() - 1) {
                        sql.append_syntax(", ");
                    }
                }
                sql.append_syntax(")");
            }
            Expression::Count(count_type) => {
                sql.append_syntax("COUNT");
                sql.append_syntax("(");
                count_type.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::DateTrunc { unit, expression } => date_trunc_to_sql(*unit, expression, sql),
        }
    }
}

fn date_trunc_to_sql(unit: DateUnit, expression: &Expression, sql: &mut SQL) {
    match sql.dialect {
        Dialect::Postgres => {
            sql.append_syntax("date_trunc(");
            sql.append_string_literal(unit.name());
            sql.append_syntax(", ");
            expression.to_sql(sql);
            sql.append_syntax(")");
        }
        Dialect::Sqlite => match unit {
            DateUnit::Year | DateUnit::Month => {
                sql.append_syntax("strftime(");
                sql.append_string_literal(if unit == DateUnit::Year {
                    "%Y-01-01"
                } else {
                    "%Y-%m-01"
                });
                sql.append_syntax(", ");
                expression.to_sql(sql);
                sql.append_syntax(")");
            }
            DateUnit::Quarter => {
                sql.append_syntax("printf('%s-%02d-01', strftime('%Y', ");
                expression.to_sql(sql);
                sql.append_syntax("), ((CAST(strftime('%m', ");
                expression.to_sql(sql);
                sql.append_syntax(") AS INTEGER) - 1) / 3) * 3 + 1)");
            }
            DateUnit::Week => {
                // the monday on or before the date
                sql.append_syntax("date(");
                expression.to_sql(sql);
                sql.append_syntax(", '-6 days', 'weekday 1')");
            }
            DateUnit::Day => {
                sql.append_syntax("date(");
                expression.to_sql(sql);
                sql.append_syntax(")");
            }
        },
    }
}

impl DateUnit {
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

impl BinaryOperator {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            BinaryOperator::Equals => sql.append_syntax(" = "),
            BinaryOperator::NotEquals => sql.append_syntax(" <> "),
            BinaryOperator::GreaterThan => sql.append_syntax(" > "),
            BinaryOperator::GreaterThanOrEqualTo => sql.append_syntax(" >= "),
            BinaryOperator::LessThan => sql.append_syntax(" < "),
            BinaryOperator::LessThanOrEqualTo => sql.append_syntax(" <= "),
            BinaryOperator::Like => sql.append_syntax(" LIKE "),
            BinaryOperator::NotLike => sql.append_syntax(" NOT LIKE "),
            BinaryOperator::Plus => sql.append_syntax(" + "),
            BinaryOperator::Minus => sql.append_syntax(" - "),
            BinaryOperator::Multiply => sql.append_syntax(" * "),
            BinaryOperator::Divide => sql.append_syntax(" / "),
            BinaryOperator::Modulo => sql.append_syntax(" % "),
            BinaryOperator::Concatenate => sql.append_syntax(" || "),
        }
    }
}

impl BinaryArrayOperator {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            BinaryArrayOperator::In => sql.append_syntax(" IN "),
            BinaryArrayOperator::NotIn => sql.append_syntax(" NOT IN "),
        }
    }
}

impl Function {
    pub fn to_sql(self, sql: &mut SQL) {
        match self {
            Function::Coalesce => sql.append_syntax("coalesce"),
            Function::Upper => sql.append_syntax("upper"),
            Function::Lower => sql.append_syntax("lower"),
            Function::Length => sql.append_syntax("length"),
            Function::Abs => sql.append_syntax("abs"),
            Function::Round => sql.append_syntax("round"),
            Function::Sum => sql.append_syntax("SUM"),
            Function::Avg => sql.append_syntax("AVG"),
            Function::Min => sql.append_syntax("MIN"),
            Function::Max => sql.append_syntax("MAX"),
        }
    }
}

impl CountType {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            CountType::Star => sql.append_syntax("*"),
            CountType::Simple(expression) => expression.to_sql(sql),
            CountType::Distinct(expression) => {
                sql.append_syntax("DISTINCT ");
                expression.to_sql(sql);
            }
        }
    }
}

impl Value {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Value::Int8(i) => sql.append_syntax(&i.to_string()),
            Value::Decimal(d) => sql.append_syntax(d),
            Value::String(s) => sql.append_string_literal(s),
            Value::Bool(true) => sql.append_syntax("true"),
            Value::Bool(false) => sql.append_syntax("false"),
            Value::Date(date) => {
                if sql.dialect == Dialect::Postgres {
                    sql.append_syntax("DATE ");
                }
                sql.append_string_literal(date);
            }
            Value::Null => sql.append_syntax("NULL"),
        }
    }
}

impl SchemaName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl TableName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl TableReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            TableReference::DBTable { schema, table } => {
                if let Some(schema) = schema {
                    schema.to_sql(sql);
                    sql.append_syntax(".");
                }
                table.to_sql(sql);
            }
            TableReference::AliasedTable(alias) => alias.to_sql(sql),
        }
    }
}

impl ColumnReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            ColumnReference::TableColumn { table, name } => {
                table.to_sql(sql);
                sql.append_syntax(".");
                sql.append_identifier(&name.0);
            }
        }
    }
}

impl TableAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl ColumnAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}
