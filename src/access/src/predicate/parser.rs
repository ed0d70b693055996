//! Tokenizer and recursive-descent parser for predicate text
//!
//! ```text
//! expr     ::= or_expr
//! or_expr  ::= and_expr (OR and_expr)*
//! and_expr ::= not_expr (AND not_expr)*
//! not_expr ::= NOT not_expr | primary
//! primary  ::= INCLUDE | EXCLUDE | ( expr ) | property tail
//! tail     ::= op literal
//!            | [NOT] IN ( literal (, literal)* )
//!            | IS [NOT] NULL
//! op       ::= = | <> | != | < | <= | > | >=
//! literal  ::= number | 'text'
//! property ::= name | "quoted name"
//! ```
//!
//! Keywords are case-insensitive.

use super::error::{PredicateError, PredicateResult};
use super::expr::{CompareOp, Literal, Predicate};

/// Maximum nesting of parentheses and `NOT`
pub const MAX_PREDICATE_DEPTH: usize = 32;

/// Parse predicate text
pub fn parse(input: &str) -> PredicateResult<Predicate> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(PredicateError::Syntax("empty predicate".into()));
    }

    let mut parser = Parser::new(&tokens);
    let predicate = parser.parse_expr()?;

    if let Some(token) = parser.current() {
        return Err(PredicateError::Syntax(format!(
            "Unexpected trailing token {:?}",
            token
        )));
    }

    Ok(predicate)
}

// ===== TOKENIZER =====

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    And,
    Or,
    Not,
    In,
    Is,
    Null,
    Include,
    Exclude,
    LeftParen,
    RightParen,
    Comma,
    Op(CompareOp),
    Identifier(String),
    Number(String),
    Text(String),
}

fn tokenize(input: &str) -> PredicateResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LeftParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RightParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '=' => {
                tokens.push(Token::Op(CompareOp::Equal));
                chars.next();
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(PredicateError::Syntax(
                        "Single '!' not allowed, use '!=' or NOT".into(),
                    ));
                }
                tokens.push(Token::Op(CompareOp::NotEqual));
            }
            '<' => {
                chars.next();
                let op = if chars.next_if_eq(&'=').is_some() {
                    CompareOp::LessThanOrEqual
                } else if chars.next_if_eq(&'>').is_some() {
                    CompareOp::NotEqual
                } else {
                    CompareOp::LessThan
                };
                tokens.push(Token::Op(op));
            }
            '>' => {
                chars.next();
                let op = if chars.next_if_eq(&'=').is_some() {
                    CompareOp::GreaterThanOrEqual
                } else {
                    CompareOp::GreaterThan
                };
                tokens.push(Token::Op(op));
            }
            '\'' => {
                chars.next();
                let text = read_quoted(&mut chars, '\'')
                    .ok_or_else(|| PredicateError::Syntax("Unterminated string literal".into()))?;
                tokens.push(Token::Text(text));
            }
            '"' => {
                chars.next();
                let name = read_quoted(&mut chars, '"')
                    .ok_or_else(|| PredicateError::Syntax("Unterminated quoted identifier".into()))?;
                tokens.push(Token::Identifier(name));
            }
            c if c.is_ascii_digit() || c == '-' => {
                tokens.push(Token::Number(read_number(&mut chars)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    word.push(c);
                }
                let token = match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "IN" => Token::In,
                    "IS" => Token::Is,
                    "NULL" => Token::Null,
                    "INCLUDE" => Token::Include,
                    "EXCLUDE" => Token::Exclude,
                    _ => Token::Identifier(word),
                };
                tokens.push(token);
            }
            _ => {
                return Err(PredicateError::Syntax(format!(
                    "Unexpected character: '{}'",
                    ch
                )))
            }
        }
    }

    Ok(tokens)
}

/// Reads up to the closing quote; a doubled quote is an escaped quote
fn read_quoted(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
) -> Option<String> {
    let mut value = String::new();
    loop {
        match chars.next()? {
            c if c == quote => {
                if chars.next_if_eq(&quote).is_some() {
                    value.push(quote);
                } else {
                    return Some(value);
                }
            }
            c => value.push(c),
        }
    }
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> PredicateResult<String> {
    let mut number = String::new();
    if let Some(sign) = chars.next_if_eq(&'-') {
        number.push(sign);
    }

    let mut digits = 0;
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        number.push(c);
        digits += 1;
    }
    if digits == 0 {
        return Err(PredicateError::Syntax(format!(
            "Malformed number: '{}'",
            number
        )));
    }

    if let Some(dot) = chars.next_if_eq(&'.') {
        number.push(dot);
        let mut fraction = 0;
        while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
            number.push(c);
            fraction += 1;
        }
        if fraction == 0 {
            return Err(PredicateError::Syntax(format!(
                "Malformed number: '{}'",
                number
            )));
        }
    }

    Ok(number)
}

// ===== PARSER =====

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> PredicateResult<()> {
        match self.advance() {
            Some(token) if token == &expected => Ok(()),
            Some(token) => Err(PredicateError::Syntax(format!(
                "Expected {:?}, got {:?}",
                expected, token
            ))),
            None => Err(PredicateError::Syntax(format!(
                "Expected {:?}, got end of input",
                expected
            ))),
        }
    }

    fn enter(&mut self) -> PredicateResult<()> {
        self.depth += 1;
        if self.depth > MAX_PREDICATE_DEPTH {
            return Err(PredicateError::TooDeep {
                max: MAX_PREDICATE_DEPTH,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_expr(&mut self) -> PredicateResult<Predicate> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PredicateResult<Predicate> {
        let mut left = self.parse_and()?;

        while matches!(self.current(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = Predicate::or(left, right);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> PredicateResult<Predicate> {
        let mut left = self.parse_not()?;

        while matches!(self.current(), Some(Token::And)) {
            self.advance();
            let right = self.parse_not()?;
            left = Predicate::and(left, right);
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> PredicateResult<Predicate> {
        if matches!(self.current(), Some(Token::Not)) {
            self.advance();
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            Ok(Predicate::negate(inner))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> PredicateResult<Predicate> {
        match self.advance() {
            Some(Token::Include) => Ok(Predicate::Include),
            Some(Token::Exclude) => Ok(Predicate::Exclude),
            Some(Token::LeftParen) => {
                self.enter()?;
                let inner = self.parse_expr()?;
                self.expect(Token::RightParen)?;
                self.leave();
                Ok(inner)
            }
            Some(Token::Identifier(property)) => self.parse_condition(property.clone()),
            Some(token) => Err(PredicateError::Syntax(format!(
                "Expected expression, got {:?}",
                token
            ))),
            None => Err(PredicateError::Syntax(
                "Expected expression, got end of input".into(),
            )),
        }
    }

    fn parse_condition(&mut self, property: String) -> PredicateResult<Predicate> {
        match self.advance() {
            Some(Token::Op(op)) => {
                let value = self.parse_literal()?;
                Ok(Predicate::Compare {
                    property,
                    op: *op,
                    value,
                })
            }
            Some(Token::In) => self.parse_in(property, false),
            Some(Token::Not) => {
                self.expect(Token::In)?;
                self.parse_in(property, true)
            }
            Some(Token::Is) => {
                let negated = matches!(self.current(), Some(Token::Not));
                if negated {
                    self.advance();
                }
                self.expect(Token::Null)?;
                Ok(Predicate::IsNull { property, negated })
            }
            Some(token) => Err(PredicateError::Syntax(format!(
                "Expected comparison after '{}', got {:?}",
                property, token
            ))),
            None => Err(PredicateError::Syntax(format!(
                "Expected comparison after '{}', got end of input",
                property
            ))),
        }
    }

    fn parse_in(&mut self, property: String, negated: bool) -> PredicateResult<Predicate> {
        self.expect(Token::LeftParen)?;

        let mut values = vec![self.parse_literal()?];
        while matches!(self.current(), Some(Token::Comma)) {
            self.advance();
            values.push(self.parse_literal()?);
        }

        self.expect(Token::RightParen)?;

        Ok(Predicate::In {
            property,
            values,
            negated,
        })
    }

    fn parse_literal(&mut self) -> PredicateResult<Literal> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Literal::Number(n.clone())),
            Some(Token::Text(s)) => Ok(Literal::Text(s.clone())),
            Some(token) => Err(PredicateError::Syntax(format!(
                "Expected literal, got {:?}",
                token
            ))),
            None => Err(PredicateError::Syntax(
                "Expected literal, got end of input".into(),
            )),
        }
    }
}
