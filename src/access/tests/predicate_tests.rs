//! Property tests for predicate compilation

use layergate_access::predicate::{
    compile_predicate, parse_predicate, Predicate, DEFAULT_FILTER_TEMPLATE,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_numeric_tokens_become_in_list(tokens in prop::collection::vec(0u32..100_000, 1..40)) {
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        match compile_predicate(DEFAULT_FILTER_TEMPLATE, &tokens) {
            Predicate::In { property, values, negated } => {
                prop_assert_eq!(property, "service_id");
                prop_assert_eq!(values.len(), tokens.len());
                prop_assert!(!negated);
            }
            other => prop_assert!(false, "unexpected predicate {}", other),
        }
    }

    #[test]
    fn prop_parser_never_panics(input in ".{0,200}") {
        if let Ok(predicate) = parse_predicate(&input) {
            // Whatever parses must print back into something equivalent
            let reparsed = parse_predicate(&predicate.to_string());
            prop_assert_eq!(reparsed.ok(), Some(predicate));
        }
    }

    #[test]
    fn prop_unparsable_output_denies(garbage in "[(),' ]{1,20}") {
        let tokens = vec![garbage];
        let predicate = compile_predicate("service_id IN ({0})", &tokens);
        prop_assert!(!predicate.is_include());
    }
}

#[test]
fn test_empty_token_list_denies() {
    assert_eq!(compile_predicate(DEFAULT_FILTER_TEMPLATE, &[]), Predicate::Exclude);
}

#[test]
fn test_template_errors_deny() {
    let tokens = vec!["1".to_string()];

    assert_eq!(compile_predicate("svc IN ({1})", &tokens), Predicate::Exclude);
    assert_eq!(compile_predicate("svc IN ({0)", &tokens), Predicate::Exclude);
    assert_eq!(compile_predicate("", &tokens), Predicate::Exclude);
}

#[test]
fn test_placeholder_repeats() {
    let tokens = vec!["4".to_string(), "5".to_string()];
    let predicate = compile_predicate("a IN ({0}) OR b IN ({0})", &tokens);

    assert_eq!(predicate.to_string(), "a IN (4, 5) OR b IN (4, 5)");
}
