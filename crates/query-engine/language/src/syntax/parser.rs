//! Recursive-descent parser for EQL.
//!
//! The entry point is [`parse`], which tokenizes the input and then parses a
//! single query into a [`cst::Query`]. Parsing stops at the first error.

use super::cst::{self, *};
use super::error::{Position, SyntaxError};
use super::lexer::{tokenize, Keyword, LocatedToken, Token};

/// A parsed query and its description block.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub description: Option<String>,
    pub query: cst::Query,
}

/// Parse EQL text.
pub fn parse(text: &str) -> Result<Parsed, SyntaxError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens: tokens.tokens,
        pos: 0,
    };
    let query = parser.parse_query()?;
    Ok(Parsed {
        description: tokens.description,
        query,
    })
}

struct Parser {
    tokens: Vec<LocatedToken>,
    pos: usize,
}

static EOF: Token = Token::Eof;

impl Parser {
    // =======================================================================
    // Token helpers
    // =======================================================================

    fn current(&self) -> &Token {
        self.peek_ahead(0)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map_or(&EOF, |located| &located.token)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(Position::new(1, 1), |located| located.position)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        self.current() == &Token::Keyword(keyword)
    }

    /// Consume the keyword if it is next.
    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), SyntaxError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&expected.describe()))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), SyntaxError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(keyword.as_str()))
        }
    }

    fn expect_identifier(&mut self) -> Result<Ident, SyntaxError> {
        let position = self.position();
        match self.current().clone() {
            Token::Identifier(name) | Token::QuotedIdentifier(name) => {
                self.advance();
                Ok(Ident { name, position })
            }
            _ => Err(self.error("identifier")),
        }
    }

    /// After a `.`, any word names a field, keywords included, spelled as written.
    fn expect_field_name(&mut self) -> Result<Ident, SyntaxError> {
        if let Some(located) = self.tokens.get(self.pos) {
            if matches!(located.token, Token::Keyword(_)) {
                let ident = Ident {
                    name: located.text.clone(),
                    position: located.position,
                };
                self.advance();
                return Ok(ident);
            }
        }
        self.expect_identifier()
    }

    fn is_identifier(&self) -> bool {
        matches!(
            self.current(),
            Token::Identifier(_) | Token::QuotedIdentifier(_)
        )
    }

    fn error(&self, expected: &str) -> SyntaxError {
        SyntaxError {
            position: self.position(),
            found: self.current().describe(),
            expected: expected.to_string(),
        }
    }

    // =======================================================================
    // Queries
    // =======================================================================

    fn parse_query(&mut self) -> Result<Query, SyntaxError> {
        let mut blocks = vec![];
        while self.eat_keyword(Keyword::With) {
            let name = self.expect_identifier()?;
            self.expect_keyword(Keyword::As)?;
            self.expect(&Token::LeftParen)?;
            let body = self.parse_set()?;
            self.expect(&Token::RightParen)?;
            blocks.push(Block { name, body });
        }
        let body = self.parse_set()?;
        if self.current() != &Token::Eof {
            return Err(self.error("end of input"));
        }
        Ok(Query { blocks, body })
    }

    fn parse_set(&mut self) -> Result<SetExpr, SyntaxError> {
        let mut left = SetExpr::Select(Box::new(self.parse_select()?));
        loop {
            let position = self.position();
            let operator = if self.eat_keyword(Keyword::Union) {
                if self.eat_keyword(Keyword::All) {
                    SetOperator::UnionAll
                } else {
                    SetOperator::Union
                }
            } else if self.eat_keyword(Keyword::Intersect) {
                SetOperator::Intersect
            } else if self.eat_keyword(Keyword::Except) {
                SetOperator::Except
            } else {
                break;
            };
            let right = SetExpr::Select(Box::new(self.parse_select()?));
            left = SetExpr::Operation {
                left: Box::new(left),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_select(&mut self) -> Result<Select, SyntaxError> {
        let position = self.position();
        self.expect_keyword(Keyword::Find)?;
        let mut sources = vec![self.parse_source()?];
        while self.eat(&Token::Comma) {
            sources.push(self.parse_source()?);
        }

        let filter = if self.eat_keyword(Keyword::Filter) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect_keyword(Keyword::Fetch)?;
        let distinct = self.eat_keyword(Keyword::Distinct);
        let mut outputs = vec![self.parse_output()?];
        while self.eat(&Token::Comma) {
            outputs.push(self.parse_output()?);
        }

        let mut group = vec![];
        if self.eat_keyword(Keyword::Group) {
            group = self.parse_expr_list()?;
        }

        let having = if self.is_keyword(Keyword::Having) {
            let position = self.position();
            self.advance();
            Some(Having {
                position,
                condition: self.parse_expr()?,
            })
        } else {
            None
        };

        let mut order = vec![];
        if self.eat_keyword(Keyword::Order) {
            order.push(self.parse_ordering()?);
            while self.eat(&Token::Comma) {
                order.push(self.parse_ordering()?);
            }
        }

        let limit = if self.eat_keyword(Keyword::Limit) {
            match self.current() {
                Token::Integer(digits) => {
                    let limit = digits
                        .parse::<u64>()
                        .map_err(|_| self.error("a row count"))?;
                    self.advance();
                    Some(limit)
                }
                _ => return Err(self.error("a row count")),
            }
        } else {
            None
        };

        Ok(Select {
            position,
            sources,
            filter,
            distinct,
            outputs,
            group,
            having,
            order,
            limit,
        })
    }

    fn parse_source(&mut self) -> Result<Source, SyntaxError> {
        let optional = self.eat_keyword(Keyword::Optional);
        let entity = self.expect_identifier()?;
        let alias = if self.is_identifier() {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(Source {
            optional,
            entity,
            alias,
        })
    }

    fn parse_output(&mut self) -> Result<Output, SyntaxError> {
        if self.is_identifier()
            && self.peek_ahead(1) == &Token::Dot
            && self.peek_ahead(2) == &Token::Star
        {
            let source = self.expect_identifier()?;
            self.advance();
            self.advance();
            return Ok(Output::Star { source });
        }

        let expr = self.parse_expr()?;
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(Output::Expr { expr, alias })
    }

    fn parse_ordering(&mut self) -> Result<Ordering, SyntaxError> {
        let expr = self.parse_expr()?;
        let direction = if self.eat_keyword(Keyword::Asc) {
            Some(Direction::Asc)
        } else if self.eat_keyword(Keyword::Desc) {
            Some(Direction::Desc)
        } else {
            None
        };
        Ok(Ordering { expr, direction })
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    // =======================================================================
    // Expressions, lowest precedence first
    // =======================================================================

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and_expr()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator: BinaryOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not_expr()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator: BinaryOperator::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.is_keyword(Keyword::Not) {
            let position = self.position();
            self.advance();
            let expr = self.parse_not_expr()?;
            Ok(Expr::Not {
                expr: Box::new(expr),
                position,
            })
        } else {
            self.parse_predicate()
        }
    }

    /// Comparisons and tests do not chain: `a = b = c` is an error.
    fn parse_predicate(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_additive()?;

        let comparison = match self.current() {
            Token::Eq => Some(BinaryOperator::Equals),
            Token::NotEq => Some(BinaryOperator::NotEquals),
            Token::Lt => Some(BinaryOperator::LessThan),
            Token::LtEq => Some(BinaryOperator::LessThanOrEqualTo),
            Token::Gt => Some(BinaryOperator::GreaterThan),
            Token::GtEq => Some(BinaryOperator::GreaterThanOrEqualTo),
            _ => None,
        };
        if let Some(operator) = comparison {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            });
        }

        if self.eat_keyword(Keyword::Is) {
            let negated = self.eat_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let negated = if self.is_keyword(Keyword::Not)
            && matches!(
                self.peek_ahead(1),
                Token::Keyword(Keyword::In | Keyword::Like | Keyword::Between)
            ) {
            self.advance();
            true
        } else {
            false
        };

        if self.eat_keyword(Keyword::In) {
            self.expect(&Token::LeftParen)?;
            let list = self.parse_expr_list()?;
            self.expect(&Token::RightParen)?;
            Ok(Expr::InList {
                expr: Box::new(left),
                list,
                negated,
            })
        } else if self.eat_keyword(Keyword::Like) {
            let pattern = self.parse_additive()?;
            Ok(Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(pattern),
                negated,
            })
        } else if self.eat_keyword(Keyword::Between) {
            let low = self.parse_additive()?;
            self.expect_keyword(Keyword::And)?;
            let high = self.parse_additive()?;
            Ok(Expr::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            })
        } else {
            Ok(left)
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                Token::Concat => BinaryOperator::Concat,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.current() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.current() == &Token::Minus {
            let position = self.position();
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(Expr::Negate {
                expr: Box::new(expr),
                position,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let position = self.position();
        let literal = |value: Literal| -> Result<Expr, SyntaxError> {
            Ok(Expr::Literal { value, position })
        };

        match self.current().clone() {
            Token::Integer(digits) => {
                self.advance();
                literal(Literal::Integer(digits))
            }
            Token::Decimal(digits) => {
                self.advance();
                literal(Literal::Decimal(digits))
            }
            Token::String(value) => {
                self.advance();
                literal(Literal::String(value))
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                literal(Literal::Boolean(true))
            }
            Token::Keyword(Keyword::False) => {
                self.advance();
                literal(Literal::Boolean(false))
            }
            Token::Keyword(Keyword::Null) => {
                self.advance();
                literal(Literal::Null)
            }
            Token::Keyword(Keyword::Date) => {
                self.advance();
                if let Token::String(value) = self.current().clone() {
                    self.advance();
                    return literal(Literal::Date(value));
                }
                // a field that happens to be called `date`
                Ok(Expr::Field {
                    qualifier: None,
                    name: Ident {
                        name: "date".to_string(),
                        position,
                    },
                })
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(Expr::Paren {
                    expr: Box::new(expr),
                    position,
                })
            }
            Token::Identifier(_) | Token::QuotedIdentifier(_) => {
                let name = self.expect_identifier()?;
                if self.current() == &Token::LeftParen {
                    self.advance();
                    return self.parse_call(name);
                }
                if self.eat(&Token::Dot) {
                    let field = self.expect_field_name()?;
                    return Ok(Expr::Field {
                        qualifier: Some(name),
                        name: field,
                    });
                }
                Ok(Expr::Field {
                    qualifier: None,
                    name,
                })
            }
            _ => Err(self.error("an expression")),
        }
    }

    /// Arguments of a call, after the opening parenthesis.
    fn parse_call(&mut self, name: Ident) -> Result<Expr, SyntaxError> {
        if self.eat(&Token::Star) {
            self.expect(&Token::RightParen)?;
            return Ok(Expr::Call {
                name,
                distinct: false,
                arguments: Arguments::Star,
            });
        }
        let distinct = self.eat_keyword(Keyword::Distinct);
        let args = if !distinct && self.current() == &Token::RightParen {
            vec![]
        } else {
            self.parse_expr_list()?
        };
        self.expect(&Token::RightParen)?;
        Ok(Expr::Call {
            name,
            distinct,
            arguments: Arguments::List(args),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_select(text: &str) -> Select {
        match parse(text).unwrap().query.body {
            SetExpr::Select(select) => *select,
            SetExpr::Operation { .. } => panic!("expected a single select"),
        }
    }

    #[test]
    fn parse_simple_find() {
        let select = parse_select("FIND products p, OPTIONAL categories FETCH p.product_name");
        assert_eq!(select.sources.len(), 2);
        assert_eq!(select.sources[0].entity.name, "products");
        assert_eq!(select.sources[0].alias.as_ref().unwrap().name, "p");
        assert!(select.sources[1].optional);
        assert!(select.sources[1].alias.is_none());
        assert!(matches!(
            &select.outputs[0],
            Output::Expr { expr: Expr::Field { qualifier: Some(q), name }, alias: None }
                if q.name == "p" && name.name == "product_name"
        ));
    }

    #[test]
    fn parse_every_clause() {
        let select = parse_select(
            "FIND orders o FILTER o.freight > 10 FETCH DISTINCT o.ship_country, count(*) AS n \
             GROUP o.ship_country HAVING count(*) > 2 ORDER n DESC, o.ship_country LIMIT 5",
        );
        assert!(select.filter.is_some());
        assert!(select.distinct);
        assert_eq!(select.group.len(), 1);
        assert!(select.having.is_some());
        assert_eq!(select.order[0].direction, Some(Direction::Desc));
        assert_eq!(select.order[1].direction, None);
        assert_eq!(select.limit, Some(5));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let select = parse_select("FIND t FILTER a = 1 OR b = 2 AND NOT c = 3 FETCH a");
        let Some(Expr::Binary {
            operator: BinaryOperator::Or,
            right,
            ..
        }) = select.filter
        else {
            panic!("expected OR at top level");
        };
        let Expr::Binary {
            operator: BinaryOperator::And,
            right,
            ..
        } = *right
        else {
            panic!("expected AND under OR");
        };
        assert!(matches!(*right, Expr::Not { .. }));
    }

    #[test]
    fn parse_predicates() {
        let select = parse_select(
            "FIND t FILTER a IS NOT NULL AND b NOT IN (1, 2) AND c LIKE 'x%' AND d NOT BETWEEN 1 AND 2 FETCH a",
        );
        let mut conjuncts = vec![];
        let mut current = select.filter.unwrap();
        while let Expr::Binary {
            left,
            operator: BinaryOperator::And,
            right,
        } = current
        {
            conjuncts.push(*right);
            current = *left;
        }
        conjuncts.push(current);
        conjuncts.reverse();
        assert!(matches!(conjuncts[0], Expr::IsNull { negated: true, .. }));
        assert!(matches!(&conjuncts[1], Expr::InList { negated: true, list, .. } if list.len() == 2));
        assert!(matches!(conjuncts[2], Expr::Like { negated: false, .. }));
        assert!(matches!(conjuncts[3], Expr::Between { negated: true, .. }));
    }

    #[test]
    fn parse_blocks_and_set_operations() {
        let parsed = parse(
            "WITH recent AS (FIND orders o FILTER o.order_date >= DATE '2023-01-01' FETCH o.customer_id)
             FIND recent r FETCH r.customer_id
             UNION ALL FIND customers c FETCH c.customer_id
             EXCEPT FIND customers c FETCH c.customer_id",
        )
        .unwrap();
        assert_eq!(parsed.query.blocks.len(), 1);
        assert_eq!(parsed.query.blocks[0].name.name, "recent");
        let SetExpr::Operation {
            left, operator, ..
        } = parsed.query.body
        else {
            panic!("expected a set operation");
        };
        assert_eq!(operator, SetOperator::Except);
        assert!(matches!(
            *left,
            SetExpr::Operation {
                operator: SetOperator::UnionAll,
                ..
            }
        ));
    }

    #[test]
    fn parse_calls_and_stars() {
        let select = parse_select("FIND o FETCH o.*, count(DISTINCT o.customer_id), trunc(month, o.order_date), now()");
        assert!(matches!(&select.outputs[0], Output::Star { source } if source.name == "o"));
        assert!(matches!(
            &select.outputs[1],
            Output::Expr { expr: Expr::Call { distinct: true, .. }, .. }
        ));
        assert!(matches!(
            &select.outputs[3],
            Output::Expr { expr: Expr::Call { arguments: Arguments::List(args), .. }, .. } if args.is_empty()
        ));
    }

    #[test]
    fn keywords_are_field_names_after_a_dot() {
        let select = parse_select("FIND orders o FETCH o.date, o.\"Order\"");
        assert!(matches!(
            &select.outputs[0],
            Output::Expr { expr: Expr::Field { name, .. }, .. } if name.name == "date"
        ));
        assert!(matches!(
            &select.outputs[1],
            Output::Expr { expr: Expr::Field { name, .. }, .. } if name.name == "Order"
        ));
    }

    #[test]
    fn keyword_field_names_keep_their_spelling() {
        let select = parse_select("FIND orders o FETCH o.Limit, o.order");
        let names: Vec<&str> = select
            .outputs
            .iter()
            .map(|output| match output {
                Output::Expr {
                    expr: Expr::Field { name, .. },
                    ..
                } => name.name.as_str(),
                _ => panic!("expected a field, got {output:?}"),
            })
            .collect();
        assert_eq!(names, vec!["Limit", "order"]);
    }

    #[test]
    fn reports_the_first_error() {
        let error = parse("FIND customers c\nFETCH c.name,\nORDER c.name").unwrap_err();
        assert_eq!(
            error,
            SyntaxError {
                position: Position::new(3, 1),
                found: "ORDER".to_string(),
                expected: "an expression".to_string(),
            }
        );

        let error = parse("FIND c FETCH c.x FETCH c.y").unwrap_err();
        assert_eq!(error.expected, "end of input");
        assert_eq!(error.position, Position::new(1, 18));

        let error = parse("FIND t FILTER a = b = c FETCH a").unwrap_err();
        assert_eq!(error.found, "'='");
    }
}
