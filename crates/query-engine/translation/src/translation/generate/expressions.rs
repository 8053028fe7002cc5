//! Translate resolved expressions to SQL expressions.

use query_engine_language::ast::{self, Expr, Literal};
use query_engine_sql::sql;

use crate::translation::error::GenerationError;

/// Translate an expression whose field references are bound to sources.
pub(super) fn translate_expression(expr: &Expr) -> Result<sql::ast::Expression, GenerationError> {
    Ok(match expr {
        Expr::Field(field) => {
            let table = field
                .source
                .clone()
                .ok_or(GenerationError::MissingJoinPlan)?;
            column(
                table,
                field.column.clone().unwrap_or_else(|| field.field.clone()),
            )
        }
        Expr::Literal(literal) => sql::ast::Expression::Value(translate_literal(literal)),
        Expr::And(operands) => sql::helpers::and_all(translate_all(operands)?),
        Expr::Or(operands) => sql::helpers::or_all(translate_all(operands)?),
        Expr::Not(expr) => sql::ast::Expression::Not(Box::new(translate_expression(expr)?)),
        Expr::Compare {
            left,
            operator,
            right,
        } => binary(left, compare_operator(*operator), right)?,
        Expr::IsNull { expr, negated } => sql::ast::Expression::UnaryOperation {
            expression: Box::new(translate_expression(expr)?),
            operator: if *negated {
                sql::ast::UnaryOperator::IsNotNull
            } else {
                sql::ast::UnaryOperator::IsNull
            },
        },
        Expr::InList {
            expr,
            list,
            negated,
        } => sql::ast::Expression::BinaryArrayOperation {
            left: Box::new(translate_expression(expr)?),
            operator: if *negated {
                sql::ast::BinaryArrayOperator::NotIn
            } else {
                sql::ast::BinaryArrayOperator::In
            },
            right: translate_all(list)?,
        },
        Expr::Like {
            expr,
            pattern,
            negated,
        } => binary(
            expr,
            if *negated {
                sql::ast::BinaryOperator::NotLike
            } else {
                sql::ast::BinaryOperator::Like
            },
            pattern,
        )?,
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => sql::ast::Expression::Between {
            expression: Box::new(translate_expression(expr)?),
            low: Box::new(translate_expression(low)?),
            high: Box::new(translate_expression(high)?),
            negated: *negated,
        },
        Expr::Arithmetic {
            left,
            operator,
            right,
        } => binary(left, arithmetic_operator(*operator), right)?,
        Expr::Negate(expr) => sql::ast::Expression::UnaryOperation {
            expression: Box::new(translate_expression(expr)?),
            operator: sql::ast::UnaryOperator::Negate,
        },
        Expr::Aggregate {
            function,
            distinct,
            argument,
        } => translate_aggregate(*function, *distinct, argument.as_deref())?,
        Expr::Function { name, args } => sql::ast::Expression::FunctionCall {
            function: scalar_function(name)?,
            args: translate_all(args)?,
        },
        Expr::DateTrunc { unit, expr } => sql::ast::Expression::DateTrunc {
            unit: date_unit(*unit),
            expression: Box::new(translate_expression(expr)?),
        },
    })
}

pub(super) fn column(table: String, name: String) -> sql::ast::Expression {
    sql::ast::Expression::ColumnReference(sql::ast::ColumnReference::TableColumn {
        table: sql::helpers::make_table_alias(table),
        name: sql::ast::ColumnName(name),
    })
}

fn translate_all(exprs: &[Expr]) -> Result<Vec<sql::ast::Expression>, GenerationError> {
    exprs.iter().map(translate_expression).collect()
}

fn binary(
    left: &Expr,
    operator: sql::ast::BinaryOperator,
    right: &Expr,
) -> Result<sql::ast::Expression, GenerationError> {
    Ok(sql::ast::Expression::BinaryOperation {
        left: Box::new(translate_expression(left)?),
        operator,
        right: Box::new(translate_expression(right)?),
    })
}

fn translate_literal(literal: &Literal) -> sql::ast::Value {
    match literal {
        Literal::Integer(value) => sql::ast::Value::Int8(*value),
        Literal::Decimal(value) => sql::ast::Value::Decimal(value.clone()),
        Literal::String(value) => sql::ast::Value::String(value.clone()),
        Literal::Date(value) => sql::ast::Value::Date(value.clone()),
        Literal::Boolean(value) => sql::ast::Value::Bool(*value),
        Literal::Null => sql::ast::Value::Null,
    }
}

fn translate_aggregate(
    function: ast::AggregateFunction,
    distinct: bool,
    argument: Option<&Expr>,
) -> Result<sql::ast::Expression, GenerationError> {
    let argument = argument.map(translate_expression).transpose()?;
    let function = match function {
        ast::AggregateFunction::Count => {
            return Ok(sql::ast::Expression::Count(match argument {
                None => sql::ast::CountType::Star,
                Some(argument) if distinct => sql::ast::CountType::Distinct(Box::new(argument)),
                Some(argument) => sql::ast::CountType::Simple(Box::new(argument)),
            }))
        }
        ast::AggregateFunction::Sum => sql::ast::Function::Sum,
        ast::AggregateFunction::Avg => sql::ast::Function::Avg,
        ast::AggregateFunction::Min => sql::ast::Function::Min,
        ast::AggregateFunction::Max => sql::ast::Function::Max,
    };
    if distinct {
        return Err(GenerationError::NotSupported(format!(
            "DISTINCT inside {}",
            function_name(function)
        )));
    }
    let argument = argument.ok_or_else(|| {
        GenerationError::NotSupported(format!("{}(*)", function_name(function)))
    })?;
    Ok(sql::ast::Expression::FunctionCall {
        function,
        args: vec![argument],
    })
}

fn function_name(function: sql::ast::Function) -> &'static str {
    match function {
        sql::ast::Function::Sum => "sum",
        sql::ast::Function::Avg => "avg",
        sql::ast::Function::Min => "min",
        sql::ast::Function::Max => "max",
        sql::ast::Function::Coalesce => "coalesce",
        sql::ast::Function::Upper => "upper",
        sql::ast::Function::Lower => "lower",
        sql::ast::Function::Length => "length",
        sql::ast::Function::Abs => "abs",
        sql::ast::Function::Round => "round",
    }
}

fn scalar_function(name: &str) -> Result<sql::ast::Function, GenerationError> {
    match name {
        "upper" => Ok(sql::ast::Function::Upper),
        "lower" => Ok(sql::ast::Function::Lower),
        "length" => Ok(sql::ast::Function::Length),
        "abs" => Ok(sql::ast::Function::Abs),
        "round" => Ok(sql::ast::Function::Round),
        "coalesce" => Ok(sql::ast::Function::Coalesce),
        _ => Err(GenerationError::UnsupportedFunction {
            name: name.to_string(),
        }),
    }
}

fn compare_operator(operator: ast::CompareOperator) -> sql::ast::BinaryOperator {
    match operator {
        ast::CompareOperator::Equals => sql::ast::BinaryOperator::Equals,
        ast::CompareOperator::NotEquals => sql::ast::BinaryOperator::NotEquals,
        ast::CompareOperator::LessThan => sql::ast::BinaryOperator::LessThan,
        ast::CompareOperator::LessThanOrEqualTo => sql::ast::BinaryOperator::LessThanOrEqualTo,
        ast::CompareOperator::GreaterThan => sql::ast::BinaryOperator::GreaterThan,
        ast::CompareOperator::GreaterThanOrEqualTo => {
            sql::ast::BinaryOperator::GreaterThanOrEqualTo
        }
    }
}

fn arithmetic_operator(operator: ast::ArithmeticOperator) -> sql::ast::BinaryOperator {
    match operator {
        ast::ArithmeticOperator::Add => sql::ast::BinaryOperator::Plus,
        ast::ArithmeticOperator::Subtract => sql::ast::BinaryOperator::Minus,
        ast::ArithmeticOperator::Multiply => sql::ast::BinaryOperator::Multiply,
        ast::ArithmeticOperator::Divide => sql::ast::BinaryOperator::Divide,
        ast::ArithmeticOperator::Modulo => sql::ast::BinaryOperator::Modulo,
        ast::ArithmeticOperator::Concat => sql::ast::BinaryOperator::Concatenate,
    }
}

fn date_unit(unit: ast::DateUnit) -> sql::ast::DateUnit {
    match unit {
        ast::DateUnit::Year => sql::ast::DateUnit::Year,
        ast::DateUnit::Quarter => sql::ast::DateUnit::Quarter,
        ast::DateUnit::Month => sql::ast::DateUnit::Month,
        ast::DateUnit::Week => sql::ast::DateUnit::Week,
        ast::DateUnit::Day => sql::ast::DateUnit::Day,
    }
}
