//! Translate a resolved query tree to a SQL statement.

mod blocks;
mod expressions;

use query_engine_language::ast;
use query_engine_sql::sql;

use super::error::GenerationError;
use super::resolve::ResolvedQuery;

/// Options that change the SQL produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerateOptions {
    pub dialect: sql::dialect::Dialect,
}

/// Translate a resolved query to an execution plan.
///
/// Blocks become common table expressions, defined before the blocks and the
/// body that read them.
pub fn generate(
    resolved: &ResolvedQuery,
    options: &GenerateOptions,
) -> Result<sql::execution_plan::ExecutionPlan, GenerationError> {
    let query = &resolved.query;
    let mut generator = Generator { sets: 0 };

    let common_table_expressions = blocks::dependency_order(&query.blocks)?
        .into_iter()
        .map(|block| {
            Ok(sql::ast::CommonTableExpression {
                alias: sql::helpers::make_table_alias(block.name.clone()),
                select: generator.translate_set(&block.body)?,
            })
        })
        .collect::<Result<Vec<_>, GenerationError>>()?;

    let body = generator.translate_set(&query.body)?;

    Ok(sql::execution_plan::ExecutionPlan {
        columns: query
            .body
            .first_select()
            .output_aliases()
            .into_iter()
            .map(ToString::to_string)
            .collect(),
        query: sql::ast::Query {
            with: sql::ast::With {
                common_table_expressions,
            },
            body,
        },
        dialect: options.dialect,
    })
}

struct Generator {
    /// Subqueries named so far, for `set_<n>` aliases.
    sets: usize,
}

impl Generator {
    fn translate_set(&mut self, set: &ast::SetExpr) -> Result<sql::ast::SetExpression, GenerationError> {
        match set {
            ast::SetExpr::Select(select) => Ok(sql::ast::SetExpression::Select(Box::new(
                translate_select(select)?,
            ))),
            ast::SetExpr::Compound {
                left,
                operator,
                right,
            } => {
                let nest_left = match left.as_ref() {
                    ast::SetExpr::Select(select) => has_own_ordering(select),
                    ast::SetExpr::Compound {
                        operator: left_operator,
                        ..
                    } => left_operator != operator,
                };
                let nest_right = match right.as_ref() {
                    ast::SetExpr::Select(select) => has_own_ordering(select),
                    ast::SetExpr::Compound { .. } => true,
                };

                let left = self.translate_set(left)?;
                let left = if nest_left { self.nest(left) } else { left };
                let right = self.translate_set(right)?;
                let right = if nest_right { self.nest(right) } else { right };

                Ok(sql::ast::SetExpression::Compound {
                    left: Box::new(left),
                    operator: set_operator(*operator),
                    right: Box::new(right),
                })
            }
        }
    }

    /// `SELECT * FROM (<set>) AS set_<n>`
    fn nest(&mut self, set: sql::ast::SetExpression) -> sql::ast::SetExpression {
        self.sets += 1;
        let alias = sql::helpers::make_table_alias(format!("set_{}", self.sets));
        sql::ast::SetExpression::Select(Box::new(sql::helpers::select_star_from(set, alias)))
    }
}

fn translate_select(select: &ast::Select) -> Result<sql::ast::Select, GenerationError> {
    let plan = select
        .plan
        .as_ref()
        .ok_or(GenerationError::MissingJoinPlan)?;

    let select_list = select
        .outputs
        .iter()
        .map(|output| match output {
            ast::Output::Expr { expr, alias } => Ok((
                sql::helpers::make_column_alias(alias.clone()),
                expressions::translate_expression(expr)?,
            )),
            ast::Output::All { .. } => Err(GenerationError::MissingJoinPlan),
        })
        .collect::<Result<Vec<_>, GenerationError>>()?;

    let mut sql_select = sql::helpers::simple_select(select_list);
    sql_select.distinct = select.distinct;
    sql_select.from = Some(sql::ast::From::Table {
        reference: table_reference(&plan.root.relation),
        alias: sql::helpers::make_table_alias(plan.root.alias.clone()),
    });
    sql_select.joins = plan
        .joins
        .iter()
        .map(translate_join)
        .collect::<Result<Vec<_>, GenerationError>>()?;

    if let Some(filter) = &select.filter {
        sql_select.where_ = sql::ast::Where(expressions::translate_expression(filter)?);
    }
    sql_select.group_by = sql::ast::GroupBy {
        elements: select
            .group
            .iter()
            .map(expressions::translate_expression)
            .collect::<Result<Vec<_>, GenerationError>>()?,
    };
    if let Some(having) = &select.having {
        sql_select.having = sql::ast::Having(expressions::translate_expression(having)?);
    }
    sql_select.order_by = sql::ast::OrderBy {
        elements: select
            .order
            .iter()
            .map(|ordering| {
                Ok(sql::ast::OrderByElement {
                    target: expressions::translate_expression(&ordering.expr)?,
                    direction: match ordering.direction {
                        ast::Direction::Asc => sql::ast::OrderByDirection::Asc,
                        ast::Direction::Desc => sql::ast::OrderByDirection::Desc,
                    },
                })
            })
            .collect::<Result<Vec<_>, GenerationError>>()?,
    };
    sql_select.limit = sql::ast::Limit {
        limit: select.limit,
    };

    Ok(sql_select)
}

fn has_own_ordering(select: &ast::Select) -> bool {
    !select.order.is_empty() || select.limit.is_some()
}

fn translate_join(join: &ast::PlannedJoin) -> Result<sql::ast::Join, GenerationError> {
    let reference = table_reference(&join.target.relation);
    let alias = sql::helpers::make_table_alias(join.target.alias.clone());
    if join.kind == ast::JoinKind::Cross {
        return Ok(sql::ast::Join::CrossJoin(sql::ast::CrossJoin { reference, alias }));
    }

    let keys = join.keys.iter().map(|key| sql::ast::Expression::BinaryOperation {
        left: Box::new(expressions::column(
            key.left_alias.clone(),
            key.left_column.clone(),
        )),
        operator: sql::ast::BinaryOperator::Equals,
        right: Box::new(expressions::column(
            join.target.alias.clone(),
            key.right_column.clone(),
        )),
    });
    let conditions = join
        .conditions
        .iter()
        .map(expressions::translate_expression)
        .collect::<Result<Vec<_>, GenerationError>>()?;
    let on = sql::helpers::and_all(keys.chain(conditions));

    Ok(match join.kind {
        ast::JoinKind::LeftOuter => {
            sql::ast::Join::LeftOuterJoin(sql::ast::LeftOuterJoin { reference, alias, on })
        }
        ast::JoinKind::Inner | ast::JoinKind::Cross => {
            sql::ast::Join::InnerJoin(sql::ast::InnerJoin { reference, alias, on })
        }
    })
}

fn table_reference(relation: &ast::Relation) -> sql::ast::TableReference {
    match relation {
        ast::Relation::Table { schema, table } => sql::ast::TableReference::DBTable {
            schema: schema.clone().map(sql::ast::SchemaName),
            table: sql::ast::TableName(table.clone()),
        },
        ast::Relation::Block(name) => {
            sql::ast::TableReference::AliasedTable(sql::helpers::make_table_alias(name.clone()))
        }
    }
}

fn set_operator(operator: ast::SetOperator) -> sql::ast::SetOperator {
    match operator {
        ast::SetOperator::Union => sql::ast::SetOperator::Union,
        ast::SetOperator::UnionAll => sql::ast::SetOperator::UnionAll,
        ast::SetOperator::Intersect => sql::ast::SetOperator::Intersect,
        ast::SetOperator::Except => sql::ast::SetOperator::Except,
    }
}
