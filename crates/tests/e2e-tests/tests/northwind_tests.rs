mod common;

use query_engine_sql::sql;
use query_engine_translation::translation::{Error, ResolutionError, Warning};
use tests_common::northwind::ORDER_COUNT;

#[tokio::test]
async fn products_with_a_category() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND products p, categories c FETCH p.product_name, c.category_name",
        false,
    )
    .await?;
    assert_eq!(outcome.result.columns, vec!["product_name", "category_name"]);
    assert_eq!(outcome.result.rows.len(), 9);
    assert!(outcome.warnings().is_empty());
    Ok(())
}

#[tokio::test]
async fn orders_with_their_customer() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND customers c, orders o FETCH c.company_name, o.order_id",
        false,
    )
    .await?;
    assert_eq!(outcome.result.rows.len(), ORDER_COUNT);
    Ok(())
}

#[tokio::test]
async fn orders_per_month() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND orders o \
         FETCH trunc(month, o.order_date) AS month, count(*) AS orders \
         GROUP trunc(month, o.order_date) ORDER month",
        false,
    )
    .await?;
    assert_eq!(outcome.result.columns, vec!["month", "orders"]);
    assert_eq!(outcome.result.rows.len(), 50);
    insta::assert_debug_snapshot!(
        (outcome.result.rows.first(), outcome.result.rows.last()),
        @r###"
    (
        Some(
            [
                Some(
                    "2019-01-01",
                ),
                Some(
                    "6",
                ),
            ],
        ),
        Some(
            [
                Some(
                    "2023-02-01",
                ),
                Some(
                    "5",
                ),
            ],
        ),
    )
    "###
    );
    Ok(())
}

#[tokio::test]
async fn high_risk_suppliers_in_recent_orders() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND customers c, orders o, suppliers s \
         FILTER s.risk = 'high' AND o.order_date >= DATE '2023-01-01' \
         FETCH c.company_name, o.order_id, s.company_name AS supplier",
        true,
    )
    .await?;

    let sql::ast::SetExpression::Select(select) = &outcome.compiled.plan.query.body else {
        panic!("expected a single selection");
    };
    let Some(sql::ast::From::Table { alias, .. }) = &select.from else {
        panic!("expected a table in FROM");
    };
    assert_eq!(alias.name, "o");
    assert_eq!(select.joins.len(), 4);

    assert_eq!(
        outcome.result.rows,
        vec![vec![
            Some("Bon app".to_string()),
            Some("49".to_string()),
            Some("Pavlova Ltd".to_string()),
        ]]
    );
    Ok(())
}

#[tokio::test]
async fn employees_and_their_order_counts() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND employees e, OPTIONAL orders o \
         FETCH e.first_name, e.last_name, count(o.order_id) AS order_count \
         GROUP e.employee_id, e.first_name, e.last_name ORDER order_count DESC",
        false,
    )
    .await?;
    assert_eq!(
        outcome.column(2),
        vec![
            Some("4"),
            Some("2"),
            Some("2"),
            Some("2"),
            Some("1"),
            Some("0"),
            Some("0"),
            Some("0"),
            Some("0"),
        ]
    );
    assert_eq!(outcome.result.rows[0][0].as_deref(), Some("Janet"));
    Ok(())
}

#[tokio::test]
async fn products_never_ordered() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND products p, order_details d FILTER d.order_detail_id IS NULL FETCH p.product_name",
        false,
    )
    .await?;
    assert_eq!(outcome.column(0), vec![Some("Konbu")]);
    Ok(())
}

#[tokio::test]
async fn unrelated_entities_are_cross_joined() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND categories c, regions r FETCH c.category_name, r.region_description",
        false,
    )
    .await?;
    assert_eq!(outcome.result.rows.len(), 32);
    assert_eq!(
        outcome.warnings(),
        &[Warning::CrossJoin {
            alias: "r".to_string(),
            entity: "regions".to_string(),
        }]
    );
    Ok(())
}

#[tokio::test]
async fn unrelated_entities_fail_in_strict_mode() {
    let error = common::run(
        "FIND categories c, regions r FETCH c.category_name, r.region_description",
        true,
    )
    .await
    .err()
    .and_then(|error| error.downcast::<Error>().ok());
    assert_eq!(
        error,
        Some(Error::Resolution(ResolutionError::UnreachableEntities {
            entities: vec!["regions".to_string()]
        }))
    );
}

#[tokio::test]
async fn customers_and_suppliers_by_name() -> anyhow::Result<()> {
    let outcome = common::run(
        "FIND customers c FETCH c.company_name AS name \
         UNION FIND suppliers s FETCH s.company_name",
        false,
    )
    .await?;
    assert_eq!(outcome.result.columns, vec!["name"]);
    assert_eq!(outcome.result.rows.len(), 24);
    Ok(())
}

#[tokio::test]
async fn customers_with_the_most_expensive_shipments() -> anyhow::Result<()> {
    let outcome = common::run(
        "WITH expensive AS (FIND orders o FILTER o.freight > 95 FETCH o.customer_id, o.freight) \
         FIND expensive x, customers c \
         FETCH c.company_name, count(*) AS shipments \
         GROUP c.company_name ORDER shipments DESC, c.company_name LIMIT 3",
        false,
    )
    .await?;
    assert_eq!(outcome.result.columns, vec!["company_name", "shipments"]);
    assert_eq!(outcome.result.rows.len(), 3);
    Ok(())
}
