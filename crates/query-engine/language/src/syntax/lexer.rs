//! Hand-written tokenizer for EQL.

use super::error::{Position, SyntaxError};

/// Reserved words. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    With,
    As,
    Find,
    Optional,
    Filter,
    Fetch,
    Distinct,
    Group,
    Having,
    Order,
    Limit,
    Asc,
    Desc,
    And,
    Or,
    Not,
    Is,
    Null,
    In,
    Like,
    Between,
    True,
    False,
    Date,
    Union,
    All,
    Intersect,
    Except,
}

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        let keyword = match word.to_ascii_uppercase().as_str() {
            "WITH" => Keyword::With,
            "AS" => Keyword::As,
            "FIND" => Keyword::Find,
            "OPTIONAL" => Keyword::Optional,
            "FILTER" => Keyword::Filter,
            "FETCH" => Keyword::Fetch,
            "DISTINCT" => Keyword::Distinct,
            "GROUP" => Keyword::Group,
            "HAVING" => Keyword::Having,
            "ORDER" => Keyword::Order,
            "LIMIT" => Keyword::Limit,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "IS" => Keyword::Is,
            "NULL" => Keyword::Null,
            "IN" => Keyword::In,
            "LIKE" => Keyword::Like,
            "BETWEEN" => Keyword::Between,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "DATE" => Keyword::Date,
            "UNION" => Keyword::Union,
            "ALL" => Keyword::All,
            "INTERSECT" => Keyword::Intersect,
            "EXCEPT" => Keyword::Except,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::With => "WITH",
            Keyword::As => "AS",
            Keyword::Find => "FIND",
            Keyword::Optional => "OPTIONAL",
            Keyword::Filter => "FILTER",
            Keyword::Fetch => "FETCH",
            Keyword::Distinct => "DISTINCT",
            Keyword::Group => "GROUP",
            Keyword::Having => "HAVING",
            Keyword::Order => "ORDER",
            Keyword::Limit => "LIMIT",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::In => "IN",
            Keyword::Like => "LIKE",
            Keyword::Between => "BETWEEN",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Date => "DATE",
            Keyword::Union => "UNION",
            Keyword::All => "ALL",
            Keyword::Intersect => "INTERSECT",
            Keyword::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    Identifier(String),
    /// A double-quoted identifier; never a keyword.
    QuotedIdentifier(String),
    Integer(String),
    Decimal(String),
    String(String),

    Comma,
    Dot,
    LeftParen,
    RightParen,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    Eof,
}

impl Token {
    /// How the token is named in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Keyword(keyword) => keyword.as_str().to_string(),
            Token::Identifier(name) => format!("identifier '{name}'"),
            Token::QuotedIdentifier(name) => format!("identifier \"{name}\""),
            Token::Integer(value) | Token::Decimal(value) => format!("number {value}"),
            Token::String(value) => format!("string '{value}'"),
            Token::Comma => "','".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::LeftParen => "'('".to_string(),
            Token::RightParen => "')'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Concat => "'||'".to_string(),
            Token::Eq => "'='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::GtEq => "'>='".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// A token, where it starts, and the text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    pub token: Token,
    pub position: Position,
    pub text: String,
}

/// The result of tokenizing a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    pub description: Option<String>,
    /// Always ends with [`Token::Eof`].
    pub tokens: Vec<LocatedToken>,
}

/// Tokenizes EQL text. Create one with [`Lexer::new`], then call [`Lexer::tokenize`].
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Tokens, SyntaxError> {
        let description = self.read_description();
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let position = self.position();
            let start = self.pos;
            let token = self.next_token()?;
            let text = self.input[start..self.pos].iter().collect();
            let is_eof = token == Token::Eof;
            tokens.push(LocatedToken {
                token,
                position,
                text,
            });
            if is_eof {
                break;
            }
        }
        Ok(Tokens {
            description,
            tokens,
        })
    }

    // -- helpers ------------------------------------------------------------

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, position: Position, found: String, expected: &str) -> SyntaxError {
        SyntaxError {
            position,
            found,
            expected: expected.to_string(),
        }
    }

    /// Leading lines starting with `#` form the description. Blank lines before
    /// and between them are skipped.
    fn read_description(&mut self) -> Option<String> {
        let mut lines = vec![];
        loop {
            let line_start = self.pos;
            while matches!(self.peek(), Some(ch) if ch == ' ' || ch == '\t' || ch == '\r') {
                self.advance();
            }
            match self.peek() {
                Some('#') => {
                    self.advance();
                    if self.peek() == Some(' ') {
                        self.advance();
                    }
                    let mut line = String::new();
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                        line.push(ch);
                    }
                    lines.push(line.trim_end_matches('\r').to_string());
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                }
                _ => {
                    // rewind to the start of the line so its columns are counted from 1
                    self.pos = line_start;
                    self.column = 1;
                    break;
                }
            }
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
                self.advance();
            }
            if self.peek() == Some('-') && self.peek_at(1) == Some('-') {
                while let Some(ch) = self.advance() {
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    // -- main scanner -------------------------------------------------------

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let position = self.position();
        let Some(ch) = self.peek() else {
            return Ok(Token::Eof);
        };

        if ch == '\'' {
            return self.read_string_literal();
        }
        if ch == '"' {
            return self.read_quoted_identifier();
        }
        if ch.is_ascii_digit() {
            return Ok(self.read_number());
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.read_identifier_or_keyword());
        }

        self.advance();
        let token = match ch {
            ',' => Token::Comma,
            '.' => Token::Dot,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '*' => Token::Star,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' => Token::Eq,
            '|' if self.peek() == Some('|') => {
                self.advance();
                Token::Concat
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                Token::NotEq
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::LtEq
                }
                Some('>') => {
                    self.advance();
                    Token::NotEq
                }
                _ => Token::Lt,
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            other => {
                return Err(self.error(position, format!("character '{other}'"), "a token"));
            }
        };
        Ok(token)
    }

    fn read_string_literal(&mut self) -> Result<Token, SyntaxError> {
        let start = self.position();
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(self.error(
                        start,
                        "unterminated string".to_string(),
                        "closing quote",
                    ))
                }
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance();
                    value.push('\'');
                }
                Some('\'') => break,
                Some(ch) => value.push(ch),
            }
        }
        Ok(Token::String(value))
    }

    fn read_quoted_identifier(&mut self) -> Result<Token, SyntaxError> {
        let start = self.position();
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(self.error(
                        start,
                        "unterminated identifier".to_string(),
                        "closing double quote",
                    ))
                }
                Some('"') if self.peek() == Some('"') => {
                    self.advance();
                    value.push('"');
                }
                Some('"') => break,
                Some(ch) => value.push(ch),
            }
        }
        if value.is_empty() {
            return Err(self.error(start, "empty identifier".to_string(), "a name"));
        }
        Ok(Token::QuotedIdentifier(value))
    }

    fn read_number(&mut self) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            self.advance();
            text.push(ch);
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
            text.push('.');
            while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
                self.advance();
                text.push(ch);
            }
            return Token::Decimal(text);
        }
        Token::Integer(text)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self
            .peek()
            .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        {
            self.advance();
            word.push(ch);
        }
        match Keyword::lookup(&word) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(word),
        }
    }
}

/// Tokenize a query.
pub fn tokenize(input: &str) -> Result<Tokens, SyntaxError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .tokens
            .into_iter()
            .map(|located| located.token)
            .collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            tokens("find Customers c fetch c.name"),
            vec![
                Token::Keyword(Keyword::Find),
                Token::Identifier("Customers".into()),
                Token::Identifier("c".into()),
                Token::Keyword(Keyword::Fetch),
                Token::Identifier("c".into()),
                Token::Dot,
                Token::Identifier("name".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_literals_and_operators() {
        assert_eq!(
            tokens("'it''s' 12 3.50 <> != <= || \"order\""),
            vec![
                Token::String("it's".into()),
                Token::Integer("12".into()),
                Token::Decimal("3.50".into()),
                Token::NotEq,
                Token::NotEq,
                Token::LtEq,
                Token::Concat,
                Token::QuotedIdentifier("order".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn collects_the_description_and_skips_comments() {
        let result = tokenize("# Top customers\n#  by revenue\n\nFIND c -- trailing\nFETCH c.x").unwrap();
        assert_eq!(
            result.description.as_deref(),
            Some("Top customers\n by revenue")
        );
        assert_eq!(result.tokens[0].position, Position::new(4, 1));
        assert_eq!(result.tokens[2].token, Token::Keyword(Keyword::Fetch));
        assert_eq!(result.tokens[2].position, Position::new(5, 1));
    }

    #[test]
    fn reports_positions_of_bad_characters() {
        let error = tokenize("FIND c\nFETCH c.x ; ").unwrap_err();
        assert_eq!(error.position, Position::new(2, 11));
        assert_eq!(error.found, "character ';'");

        let error = tokenize("FIND c FILTER c.x = 'open").unwrap_err();
        assert_eq!(error.position, Position::new(1, 21));
        assert_eq!(error.expected, "closing quote");
    }
}
