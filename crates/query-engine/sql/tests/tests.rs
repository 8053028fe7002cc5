use query_engine_sql::sql::ast::*;
use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::helpers;
use query_engine_sql::sql::string::SQL;

fn column(table: &str, name: &str) -> Expression {
    Expression::ColumnReference(ColumnReference::TableColumn {
        table: helpers::make_table_alias(table.to_string()),
        name: ColumnName(name.to_string()),
    })
}

fn table(name: &str) -> TableReference {
    TableReference::DBTable {
        schema: None,
        table: TableName(name.to_string()),
    }
}

fn render(query: &Query, dialect: Dialect) -> String {
    let mut sql = SQL::new(dialect);
    query.to_sql(&mut sql);
    sql.sql
}

fn products_by_category() -> Select {
    let mut select = helpers::simple_select(vec![
        helpers::make_column(
            helpers::make_table_alias("p".to_string()),
            ColumnName("product_name".to_string()),
            helpers::make_column_alias("product_name".to_string()),
        ),
        (
            helpers::make_column_alias("category_name".to_string()),
            column("c", "category_name"),
        ),
    ]);
    select.from = Some(From::Table {
        reference: table("products"),
        alias: helpers::make_table_alias("p".to_string()),
    });
    select.joins = vec![Join::InnerJoin(InnerJoin {
        reference: table("categories"),
        alias: helpers::make_table_alias("c".to_string()),
        on: Expression::BinaryOperation {
            left: Box::new(column("p", "category_id")),
            operator: BinaryOperator::Equals,
            right: Box::new(column("c", "category_id")),
        },
    })];
    select
}

#[test]
fn it_converts_a_select_with_a_join() {
    let query = Query {
        with: helpers::empty_with(),
        body: SetExpression::Select(Box::new(products_by_category())),
    };
    insta::assert_snapshot!(
        render(&query, Dialect::Postgres),
        @r#"SELECT "p"."product_name" AS "product_name", "c"."category_name" AS "category_name" FROM "products" AS "p" INNER JOIN "categories" AS "c" ON ("p"."category_id" = "c"."category_id")"#
    );
}

#[test]
fn it_converts_clauses_in_order() {
    let mut select = products_by_category();
    select.distinct = true;
    select.where_ = Where(helpers::and_all(vec![
        Expression::UnaryOperation {
            expression: Box::new(column("p", "discontinued")),
            operator: UnaryOperator::IsNotNull,
        },
        Expression::BinaryArrayOperation {
            left: Box::new(column("c", "category_id")),
            operator: BinaryArrayOperator::In,
            right: vec![Expression::Value(Value::Int8(1)), Expression::Value(Value::Int8(2))],
        },
    ]));
    select.order_by = OrderBy {
        elements: vec![OrderByElement {
            target: column("p", "product_name"),
            direction: OrderByDirection::Desc,
        }],
    };
    select.limit = Limit { limit: Some(5) };
    let query = Query {
        with: helpers::empty_with(),
        body: SetExpression::Select(Box::new(select)),
    };
    insta::assert_snapshot!(
        render(&query, Dialect::Sqlite),
        @r#"SELECT DISTINCT "p"."product_name" AS "product_name", "c"."category_name" AS "category_name" FROM "products" AS "p" INNER JOIN "categories" AS "c" ON ("p"."category_id" = "c"."category_id") WHERE (("p"."discontinued" IS NOT NULL) AND ("c"."category_id" IN (1, 2))) ORDER BY "p"."product_name" DESC LIMIT 5"#
    );
}

#[test]
fn it_converts_dates_per_dialect() {
    let mut select = helpers::simple_select(vec![(
        helpers::make_column_alias("month".to_string()),
        Expression::DateTrunc {
            unit: DateUnit::Month,
            expression: Box::new(column("o", "order_date")),
        },
    )]);
    select.from = Some(From::Table {
        reference: table("orders"),
        alias: helpers::make_table_alias("o".to_string()),
    });
    select.where_ = Where(Expression::BinaryOperation {
        left: Box::new(column("o", "order_date")),
        operator: BinaryOperator::GreaterThanOrEqualTo,
        right: Box::new(Expression::Value(Value::Date("2023-01-01".to_string()))),
    });
    let query = Query {
        with: helpers::empty_with(),
        body: SetExpression::Select(Box::new(select)),
    };

    insta::assert_snapshot!(
        render(&query, Dialect::Postgres),
        @r#"SELECT date_trunc('month', "o"."order_date") AS "month" FROM "orders" AS "o" WHERE ("o"."order_date" >= DATE '2023-01-01')"#
    );
    insta::assert_snapshot!(
        render(&query, Dialect::Sqlite),
        @r#"SELECT strftime('%Y-%m-01', "o"."order_date") AS "month" FROM "orders" AS "o" WHERE ("o"."order_date" >= '2023-01-01')"#
    );
}

#[test]
fn it_converts_common_table_expressions_and_set_operations() {
    let cte = helpers::select_star_from(
        SetExpression::Select(Box::new(products_by_category())),
        helpers::make_table_alias("set_1".to_string()),
    );
    let mut from_cte = helpers::simple_select(vec![(
        helpers::make_column_alias("product_name".to_string()),
        column("t", "product_name"),
    )]);
    from_cte.from = Some(From::Table {
        reference: TableReference::AliasedTable(helpers::make_table_alias("top".to_string())),
        alias: helpers::make_table_alias("t".to_string()),
    });
    let mut counted = helpers::simple_select(vec![(
        helpers::make_column_alias("count".to_string()),
        Expression::Count(CountType::Star),
    )]);
    counted.from = Some(From::Table {
        reference: table("products"),
        alias: helpers::make_table_alias("p".to_string()),
    });

    let query = Query {
        with: With {
            common_table_expressions: vec![CommonTableExpression {
                alias: helpers::make_table_alias("top".to_string()),
                select: SetExpression::Select(Box::new(cte)),
            }],
        },
        body: SetExpression::Compound {
            left: Box::new(SetExpression::Select(Box::new(from_cte))),
            operator: SetOperator::UnionAll,
            right: Box::new(SetExpression::Select(Box::new(counted))),
        },
    };
    insta::assert_snapshot!(
        render(&query, Dialect::Postgres),
        @r#"WITH "top" AS (SELECT * FROM (SELECT "p"."product_name" AS "product_name", "c"."category_name" AS "category_name" FROM "products" AS "p" INNER JOIN "categories" AS "c" ON ("p"."category_id" = "c"."category_id")) AS "set_1") SELECT "t"."product_name" AS "product_name" FROM "top" AS "t" UNION ALL SELECT COUNT(*) AS "count" FROM "products" AS "p""#
    );
}
