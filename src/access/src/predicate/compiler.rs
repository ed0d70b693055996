//! Template + permission tokens -> predicate

use tracing::{debug, error};

use super::error::{PredicateError, PredicateResult};
use super::expr::Predicate;
use super::parser::parse;

/// Template applied when a strategy configures none
pub const DEFAULT_FILTER_TEMPLATE: &str = "service_id IN ({0})";

/// Separator used when joining permission tokens
pub const TOKEN_SEPARATOR: &str = ",";

/// Fills every `{0}` placeholder with the comma-joined tokens
///
/// Tokens are passed through as-is. Any other placeholder, or an unterminated
/// `{`, is a template error.
pub fn render_template(template: &str, tokens: &[String]) -> PredicateResult<String> {
    let joined = tokens.join(TOKEN_SEPARATOR);
    let mut rendered = String::with_capacity(template.len() + joined.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            PredicateError::Template(format!("unterminated placeholder in '{}'", template))
        })?;

        match after[..close].trim() {
            "0" => rendered.push_str(&joined),
            other => {
                return Err(PredicateError::Template(format!(
                    "unsupported placeholder {{{}}} in '{}'",
                    other, template
                )))
            }
        }
        rest = &after[close + 1..];
    }
    rendered.push_str(rest);

    Ok(rendered)
}

/// Renders and parses, reporting failures
pub fn try_compile_predicate(template: &str, tokens: &[String]) -> PredicateResult<Predicate> {
    let text = render_template(template, tokens)?;
    debug!("Compiling predicate: {}", text);
    parse(&text)
}

/// Renders and parses; any failure yields [`Predicate::Exclude`]
///
/// # Examples
///
/// ```
/// use layergate_access::predicate::{compile_predicate, Predicate};
///
/// let tokens = vec!["1".to_string(), "2".to_string()];
/// let predicate = compile_predicate("svc IN ({0})", &tokens);
/// assert_eq!(predicate.to_string(), "svc IN (1, 2)");
///
/// assert_eq!(compile_predicate("bad(((", &tokens), Predicate::Exclude);
/// ```
pub fn compile_predicate(template: &str, tokens: &[String]) -> Predicate {
    match try_compile_predicate(template, tokens) {
        Ok(predicate) => predicate,
        Err(e) => {
            error!(
                "Failed to compile predicate from template '{}', denying access: {}",
                template, e
            );
            Predicate::Exclude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::parse_predicate;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_template() {
        assert_eq!(
            render_template("svc IN ({0})", &tokens(&["1", "2"])).unwrap(),
            "svc IN (1,2)"
        );
        assert_eq!(
            render_template("a IN ({0}) OR b IN ({0})", &tokens(&["7"])).unwrap(),
            "a IN (7) OR b IN (7)"
        );
        assert_eq!(render_template("INCLUDE", &tokens(&["7"])).unwrap(), "INCLUDE");
    }

    #[test]
    fn test_render_template_errors() {
        assert!(matches!(
            render_template("svc IN ({1})", &tokens(&["1"])),
            Err(PredicateError::Template(_))
        ));
        assert!(matches!(
            render_template("svc IN ({0", &tokens(&["1"])),
            Err(PredicateError::Template(_))
        ));
    }

    #[test]
    fn test_compile_membership() {
        let predicate = compile_predicate("svc IN ({0})", &tokens(&["1", "2"]));
        assert_eq!(predicate, parse_predicate("svc IN (1,2)").unwrap());
    }

    #[test]
    fn test_compile_default_template_quoted_tokens() {
        let predicate = compile_predicate(DEFAULT_FILTER_TEMPLATE, &tokens(&["'a'", "'b'"]));
        assert_eq!(predicate.to_string(), "service_id IN ('a', 'b')");
    }

    #[test]
    fn test_compile_large_token_list() {
        let tokens: Vec<String> = (0..5_000)
            .map(|i| format!("'{:08x}-1f2e-4d3c-8b7a-{:012x}'", i, i * 7))
            .collect();

        match compile_predicate(DEFAULT_FILTER_TEMPLATE, &tokens) {
            Predicate::In {
                property, values, ..
            } => {
                assert_eq!(property, "service_id");
                assert_eq!(values.len(), 5_000);
            }
            other => panic!("expected IN, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_fails_closed() {
        assert_eq!(compile_predicate("bad(((", &tokens(&["1"])), Predicate::Exclude);
        // No permissions leaves an empty membership list
        assert_eq!(compile_predicate("FID IN ({0})", &[]), Predicate::Exclude);
        assert_eq!(compile_predicate("svc IN ({2})", &tokens(&["1"])), Predicate::Exclude);
        // A corrupted token must not widen access
        assert_eq!(
            compile_predicate("svc IN ({0})", &tokens(&["1) OR (1=1"])),
            Predicate::Exclude
        );
    }

    #[test]
    fn test_try_compile_reports_errors() {
        assert!(matches!(
            try_compile_predicate("bad(((", &[]),
            Err(PredicateError::Syntax(_))
        ));
    }
}
