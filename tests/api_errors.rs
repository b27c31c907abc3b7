// Error-path tests: registry validation, budgets, strict mode, reporters.
use std::sync::Mutex;

use vigil_core::{
    parse, parse_with_reporter, DiagnosticCode, GrammarLoadError, GrammarRegistry, LanguageId,
    ParserConfig, Reporter, Span, VigilError,
};

fn registry() -> GrammarRegistry {
    GrammarRegistry::with_builtin_grammars().expect("builtin grammars load")
}

mod registry_errors {
    use super::*;

    #[test]
    fn test_unknown_language_on_empty_registry() {
        let registry = GrammarRegistry::new();
        let err = parse(
            &registry,
            LanguageId::Go,
            "x := 1",
            &ParserConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VigilError::Grammar(GrammarLoadError::UnknownLanguage { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let mut registry = GrammarRegistry::new();
        let err = registry
            .register_json("bad.json", "{ \"language\": \"go\", ")
            .unwrap_err();
        assert!(matches!(err, GrammarLoadError::MalformedGrammar { .. }));
    }

    #[test]
    fn test_unknown_category_tag_is_rejected() {
        let mut registry = GrammarRegistry::new();
        let text = r#"{
            "language": "go",
            "version": "1",
            "keywords": { "frob": { "category": "widget", "source": "t" } }
        }"#;
        let err = registry.register_json("tags.json", text).unwrap_err();
        assert!(matches!(err, GrammarLoadError::MalformedGrammar { .. }));
    }

    #[test]
    fn test_conflicting_lexeme_across_sections() {
        let mut registry = GrammarRegistry::new();
        let text = r#"{
            "language": "go",
            "version": "1",
            "operators": { "+": { "type": "arithmetic", "source": "t" } },
            "punctuation": { "+": { "type": "other", "source": "t" } }
        }"#;
        let err = registry.register_json("dup.json", text).unwrap_err();
        assert!(matches!(
            err,
            GrammarLoadError::ConflictingLexeme { ref lexeme, .. } if lexeme == "+"
        ));
    }

    #[test]
    fn test_then_without_conditions_is_invalid() {
        let mut registry = GrammarRegistry::new();
        let text = r#"{
            "language": "go",
            "version": "1",
            "operators": {
                "<": {
                    "type": "comparison",
                    "source": "t",
                    "disambiguation": [ { "then": "generic" } ]
                }
            }
        }"#;
        let err = registry.register_json("rule.json", text).unwrap_err();
        assert!(matches!(
            err,
            GrammarLoadError::InvalidRule { ref lexeme, .. } if lexeme == "<"
        ));
    }

    #[test]
    fn test_default_must_be_last() {
        let mut registry = GrammarRegistry::new();
        let text = r#"{
            "language": "go",
            "version": "1",
            "operators": {
                "<": {
                    "type": "comparison",
                    "source": "t",
                    "disambiguation": [
                        { "default": "comparison" },
                        { "ifPrecededBy": ["identifier"], "then": "generic" }
                    ]
                }
            }
        }"#;
        let err = registry.register_json("order.json", text).unwrap_err();
        assert!(matches!(err, GrammarLoadError::InvalidRule { .. }));
    }

    #[test]
    fn test_contextual_without_rules_is_rejected() {
        let mut registry = GrammarRegistry::new();
        let text = r#"{
            "language": "go",
            "version": "1",
            "keywords": { "soft": { "category": "contextual", "source": "t", "contextual": true } }
        }"#;
        let err = registry.register_json("ctx.json", text).unwrap_err();
        assert!(matches!(
            err,
            GrammarLoadError::UnresolvableContextual { ref lexeme, .. } if lexeme == "soft"
        ));
    }

    #[test]
    fn test_duplicate_language_registration() {
        let mut registry = GrammarRegistry::new();
        let text = r#"{ "language": "go", "version": "1" }"#;
        registry.register_json("one.json", text).unwrap();
        let err = registry.register_json("two.json", text).unwrap_err();
        assert!(matches!(err, GrammarLoadError::DuplicateLanguage { .. }));
    }

    #[test]
    fn test_builtin_registry_lists_all_languages() {
        let registry = registry();
        assert_eq!(registry.languages().len(), 7);
    }
}

mod budget_tests {
    use super::*;

    #[test]
    fn test_token_budget_stops_at_limit() {
        let config = ParserConfig {
            max_tokens: 3,
            ..ParserConfig::default()
        };
        let result = parse(&registry(), LanguageId::Go, "a b c d e f", &config).unwrap();
        assert_eq!(result.tokens.len(), 3);
        assert!(result.truncated);
        assert_eq!(
            result
                .issues
                .iter()
                .filter(|i| i.code == DiagnosticCode::TokenBudgetExceeded)
                .count(),
            1
        );
    }

    #[test]
    fn test_depth_cap_emits_single_issue() {
        let config = ParserConfig {
            max_depth: 3,
            ..ParserConfig::default()
        };
        let source = "{ { { { { } } } } }";
        let result = parse(&registry(), LanguageId::Go, source, &config).unwrap();
        assert_eq!(
            result
                .issues
                .iter()
                .filter(|i| i.code == DiagnosticCode::DepthExceeded)
                .count(),
            1
        );
        // Balanced input still pairs up past the cap.
        assert!(!result
            .issues
            .iter()
            .any(|i| i.code == DiagnosticCode::StrayCloser));
    }

    #[test]
    fn test_max_errors_truncates_with_marker() {
        let config = ParserConfig {
            max_errors: 2,
            ..ParserConfig::default()
        };
        let result = parse(&registry(), LanguageId::Go, "§ § § § §", &config).unwrap();
        assert_eq!(result.issues.len(), 3);
        assert_eq!(result.issues[2].code, DiagnosticCode::IssuesTruncated);
        assert_eq!(result.total_issues, 5);
    }
}

mod strict_tests {
    use super::*;

    #[test]
    fn test_throw_on_error_returns_strict_error() {
        let config = ParserConfig {
            throw_on_error: true,
            ..ParserConfig::default()
        };
        let err = parse(&registry(), LanguageId::Go, "} oops", &config).unwrap_err();
        match err {
            VigilError::Strict(strict) => {
                assert_eq!(strict.issue_count, 1);
            }
            other => panic!("expected strict error, got {other:?}"),
        }
    }

    #[test]
    fn test_throw_on_error_passes_clean_input() {
        let config = ParserConfig {
            throw_on_error: true,
            ..ParserConfig::default()
        };
        let result = parse(&registry(), LanguageId::Go, "x := 1", &config).unwrap();
        assert_eq!(result.total_issues, 0);
    }
}

struct RecordingReporter {
    events: Mutex<Vec<(DiagnosticCode, Span)>>,
}

impl Reporter for RecordingReporter {
    fn report(&self, code: DiagnosticCode, span: Span) {
        if let Ok(mut events) = self.events.lock() {
            events.push((code, span));
        }
    }
}

#[test]
fn test_reporter_receives_every_event() {
    let reporter = RecordingReporter {
        events: Mutex::new(Vec::new()),
    };
    let config = ParserConfig {
        max_errors: 1,
        ..ParserConfig::default()
    };
    let result = parse_with_reporter(
        &registry(),
        LanguageId::Go,
        "§ § §",
        &config,
        &reporter,
        None,
    )
    .unwrap();
    let events = reporter.events.lock().unwrap();
    assert_eq!(events.len(), 3, "reporting is never capped");
    assert!(events.iter().all(|(c, _)| *c == DiagnosticCode::UnknownToken));
    assert!(result.issues.len() < events.len());
}
