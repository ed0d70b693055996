//! Predicate templating and parsing errors

use thiserror::Error;

/// Predicate compilation failure
///
/// Never escapes [`compile_predicate`](super::compile_predicate), which turns
/// any of these into the deny-all predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("Invalid template: {0}")]
    Template(String),

    #[error("Invalid predicate: {0}")]
    Syntax(String),

    #[error("Predicate nested too deeply (max depth {max})")]
    TooDeep { max: usize },
}

pub type PredicateResult<T> = std::result::Result<T, PredicateError>;
