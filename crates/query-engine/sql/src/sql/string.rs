//! Type definitions of a low-level SQL string representation.

use super::dialect::Dialect;

/// SQL text being built for a particular dialect. Literals are inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SQL {
    pub sql: String,
    pub dialect: Dialect,
}

impl SQL {
    pub fn new(dialect: Dialect) -> SQL {
        SQL {
            sql: String::new(),
            dialect,
        }
    }

    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append a double-quoted identifier.
    pub fn append_identifier(&mut self, identifier: &str) {
        self.sql.push('"');
        self.sql.push_str(&identifier.replace('"', "\"\""));
        self.sql.push('"');
    }

    /// Append a single-quoted string literal.
    pub fn append_string_literal(&mut self, literal: &str) {
        self.sql.push('\'');
        self.sql.push_str(&literal.replace('\'', "''"));
        self.sql.push('\'');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes() {
        let mut sql = SQL::new(Dialect::Postgres);
        sql.append_identifier("odd\"name");
        sql.append_syntax(" = ");
        sql.append_string_literal("O'Brien");
        assert_eq!(sql.sql, r#""odd""name" = 'O''Brien'"#);
    }
}
