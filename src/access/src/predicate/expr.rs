//! Predicate expression tree
//!
//! Predicates are built and handed out, never evaluated here. The canonical
//! text form ([`fmt::Display`]) is what security tokens are derived from, so
//! equal trees always render identically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean filter expression over feature attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches everything
    Include,

    /// Matches nothing
    Exclude,

    And(Box<Predicate>, Box<Predicate>),

    Or(Box<Predicate>, Box<Predicate>),

    Not(Box<Predicate>),

    /// `property <op> literal`
    Compare {
        property: String,
        op: CompareOp,
        value: Literal,
    },

    /// `property [NOT] IN (v1, v2, ...)`
    In {
        property: String,
        values: Vec<Literal>,
        negated: bool,
    },

    /// `property IS [NOT] NULL`
    IsNull { property: String, negated: bool },
}

impl Predicate {
    pub fn and(left: Predicate, right: Predicate) -> Self {
        Predicate::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Predicate::Or(Box::new(left), Box::new(right))
    }

    pub fn negate(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Predicate::Include)
    }

    pub fn is_exclude(&self) -> bool {
        matches!(self, Predicate::Exclude)
    }

    fn precedence(&self) -> u8 {
        match self {
            Predicate::Or(..) => 1,
            Predicate::And(..) => 2,
            Predicate::Not(_) => 3,
            _ => 4,
        }
    }

    fn fmt_operand(
        &self,
        f: &mut fmt::Formatter<'_>,
        operand: &Predicate,
        parenthesize_equal: bool,
    ) -> fmt::Result {
        let needs_parens = operand.precedence() < self.precedence()
            || (parenthesize_equal && operand.precedence() == self.precedence());
        if needs_parens {
            write!(f, "({})", operand)
        } else {
            write!(f, "{}", operand)
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Include => write!(f, "INCLUDE"),
            Predicate::Exclude => write!(f, "EXCLUDE"),
            Predicate::And(left, right) => {
                self.fmt_operand(f, left, false)?;
                write!(f, " AND ")?;
                self.fmt_operand(f, right, true)
            }
            Predicate::Or(left, right) => {
                self.fmt_operand(f, left, false)?;
                write!(f, " OR ")?;
                self.fmt_operand(f, right, true)
            }
            Predicate::Not(inner) => {
                write!(f, "NOT ")?;
                self.fmt_operand(f, inner, false)
            }
            Predicate::Compare {
                property,
                op,
                value,
            } => write!(f, "{} {} {}", Identifier(property), op, value),
            Predicate::In {
                property,
                values,
                negated,
            } => {
                write!(f, "{}", Identifier(property))?;
                if *negated {
                    write!(f, " NOT")?;
                }
                write!(f, " IN (")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
            Predicate::IsNull { property, negated } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", Identifier(property))
                } else {
                    write!(f, "{} IS NULL", Identifier(property))
                }
            }
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Equal => write!(f, "="),
            CompareOp::NotEqual => write!(f, "<>"),
            CompareOp::LessThan => write!(f, "<"),
            CompareOp::LessThanOrEqual => write!(f, "<="),
            CompareOp::GreaterThan => write!(f, ">"),
            CompareOp::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

/// Literal operand
///
/// Numbers keep their source text so that `Eq` and the canonical form are
/// exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Number(String),
    Text(String),
}

impl Literal {
    pub fn number(raw: impl Into<String>) -> Self {
        Literal::Number(raw.into())
    }

    pub fn text(raw: impl Into<String>) -> Self {
        Literal::Text(raw.into())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// Renders a property name, quoting it when it would not re-parse bare
struct Identifier<'a>(&'a str);

impl fmt::Display for Identifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_bare_identifier(self.0) {
            write!(f, "{}", self.0)
        } else {
            write!(f, "\"{}\"", self.0.replace('"', "\"\""))
        }
    }
}

const KEYWORDS: &[&str] = &[
    "AND", "OR", "NOT", "IN", "IS", "NULL", "INCLUDE", "EXCLUDE",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_') && !is_keyword(name)
}
