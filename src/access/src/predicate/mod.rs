/// Predicate compiler module
///
/// Turns a filter template plus a principal's permission tokens into a
/// [`Predicate`]. Compilation fails closed: a bad template or token yields
/// [`Predicate::Exclude`], never an error and never allow-all.
///
/// # Examples
///
/// ```
/// use layergate_access::predicate::{compile_predicate, parse_predicate, Predicate};
///
/// let tokens = vec!["10".to_string(), "20".to_string()];
/// let compiled = compile_predicate("service_id IN ({0})", &tokens);
///
/// assert_eq!(compiled, parse_predicate("service_id IN (10, 20)").unwrap());
/// assert_eq!(compile_predicate("service_id IN ({0})", &[]), Predicate::Exclude);
/// ```

mod compiler;
mod error;
mod expr;
mod parser;

pub use compiler::{
    compile_predicate, render_template, try_compile_predicate, DEFAULT_FILTER_TEMPLATE,
    TOKEN_SEPARATOR,
};
pub use error::{PredicateError, PredicateResult};
pub use expr::{CompareOp, Literal, Predicate};
pub use parser::{parse as parse_predicate, MAX_PREDICATE_DEPTH};
