//! Context disambiguation: turns draft tokens into final categories.
//!
//! Resolution is a two-stage pipeline. Grammar rules are authoritative and
//! run first; the Prophet only votes when no rule fires, and its verdicts
//! carry a confidence score the session may escalate into issues.

use log::trace;

use crate::config::ParserConfig;
use crate::grammar::{ContextKind, RuleCondition, RuleOutcome};
use crate::prophet::{self, MIN_CONFIDENCE};
use crate::registry::{CompiledGrammar, Definition};
use crate::scout;
use crate::token::{RawKind, RawToken, Token, TokenCategory, TokenStream};

/// How a draft token was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    FeatureGate,
    Rule,
    Prophet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub category: TokenCategory,
    pub via: ResolvedVia,
    /// 0-100. Rule and gate resolutions are certain by construction.
    pub confidence: u8,
}

impl Resolution {
    pub fn is_ambiguous(&self) -> bool {
        self.confidence < MIN_CONFIDENCE
    }
}

pub struct Disambiguator<'g, 'c> {
    grammar: &'g CompiledGrammar,
    config: &'c ParserConfig,
}

impl<'g, 'c> Disambiguator<'g, 'c> {
    pub fn new(grammar: &'g CompiledGrammar, config: &'c ParserConfig) -> Disambiguator<'g, 'c> {
        Disambiguator { grammar, config }
    }

    /// Resolve the draft at `raws[index]`. `stream` holds the tokens already
    /// resolved this session; `contexts` is the assembler's live stack,
    /// innermost last.
    pub fn resolve(
        &self,
        raws: &[RawToken],
        index: usize,
        stream: &TokenStream,
        contexts: &[ContextKind],
    ) -> Resolution {
        let raw = &raws[index];

        // A disabled feature gate demotes the keyword before any rule runs.
        if let Some(Definition::Keyword(def)) = self.grammar.lookup(&raw.lexeme).first() {
            if let Some(gate) = def.requires_rule {
                if !self.config.rules.allows(gate) {
                    return Resolution {
                        category: TokenCategory::Identifier,
                        via: ResolvedVia::FeatureGate,
                        confidence: 100,
                    };
                }
            }
        }

        let window = stream.trailing_window(1);
        let previous = window.first().copied();
        let lookahead = next_significant(raws, index);

        for rule in self.grammar.rules_for(&raw.lexeme) {
            if self.rule_matches(rule.conditions.as_slice(), raws, index, previous, lookahead, contexts) {
                let category = match rule.outcome {
                    RuleOutcome::Then(c) | RuleOutcome::Default(c) => c,
                };
                trace!("`{}` at {}:{} resolved by rule to {:?}", raw.lexeme, raw.line, raw.column, category);
                return Resolution {
                    category,
                    via: ResolvedVia::Rule,
                    confidence: 100,
                };
            }
        }

        let candidates = self.grammar.candidate_categories(&raw.lexeme);
        let innermost = contexts.last().copied().unwrap_or(ContextKind::TopLevel);
        match prophet::predict(&candidates, previous, lookahead, innermost) {
            Some(verdict) => {
                trace!(
                    "`{}` at {}:{} resolved by prophet to {:?} ({}%)",
                    raw.lexeme,
                    raw.line,
                    raw.column,
                    verdict.category,
                    verdict.confidence
                );
                Resolution {
                    category: verdict.category,
                    via: ResolvedVia::Prophet,
                    confidence: verdict.confidence,
                }
            }
            None => Resolution {
                category: TokenCategory::Unknown,
                via: ResolvedVia::Prophet,
                confidence: 0,
            },
        }
    }

    fn rule_matches(
        &self,
        conditions: &[RuleCondition],
        raws: &[RawToken],
        index: usize,
        previous: Option<&Token>,
        lookahead: Option<&RawToken>,
        contexts: &[ContextKind],
    ) -> bool {
        conditions.iter().all(|condition| match condition {
            RuleCondition::PrecededBy(classes) => {
                classes.iter().any(|c| c.matches_resolved(previous))
            }
            RuleCondition::NotPrecededBy(classes) => {
                !classes.iter().any(|c| c.matches_resolved(previous))
            }
            RuleCondition::FollowedBy(classes) => {
                classes.iter().any(|c| c.matches_raw(lookahead))
            }
            RuleCondition::NotFollowedBy(classes) => {
                !classes.iter().any(|c| c.matches_raw(lookahead))
            }
            RuleCondition::InParentContext(kinds) => {
                kinds.iter().any(|k| contexts.contains(k))
            }
            RuleCondition::LanguageIs(language) => self.grammar.language() == *language,
            RuleCondition::BalancedAhead(probe) => {
                scout::find_balanced(raws, index, probe).found()
            }
        })
    }
}

/// Next raw token after `index` that is not a comment.
fn next_significant<'a>(raws: &'a [RawToken], index: usize) -> Option<&'a RawToken> {
    raws[index + 1..].iter().find(|t| t.kind != RawKind::Comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::LanguageId;
    use crate::issue::{IssueCollector, NullReporter};
    use crate::registry::GrammarRegistry;
    use crate::token::{KeywordKind, OperatorKind, Span};
    use crate::tokenizer::Tokenizer;

    fn resolve_all(language: LanguageId, source: &str, config: &ParserConfig) -> Vec<Token> {
        let registry = GrammarRegistry::with_builtin_grammars().unwrap();
        let grammar = registry.grammar(language).unwrap();
        let reporter = NullReporter;
        let mut issues = IssueCollector::new(100, true, &reporter);
        let scan = Tokenizer::new(grammar).scan(source, 100_000, &mut issues);
        let disambiguator = Disambiguator::new(grammar, config);
        let mut stream = TokenStream::new();
        let contexts = [ContextKind::TopLevel];
        for (index, raw) in scan.tokens.iter().enumerate() {
            let category = raw.resolved.unwrap_or_else(|| {
                disambiguator
                    .resolve(&scan.tokens, index, &stream, &contexts)
                    .category
            });
            stream.push(Token::new(
                raw.lexeme.clone(),
                category,
                raw.span,
                raw.line,
                raw.column,
                language,
            ));
        }
        stream.into_tokens()
    }

    fn category_of<'a>(tokens: &'a [Token], lexeme: &str) -> TokenCategory {
        tokens
            .iter()
            .find(|t| t.lexeme == lexeme)
            .map(|t| t.category)
            .unwrap_or_else(|| panic!("no token `{lexeme}`"))
    }

    #[test]
    fn test_go_walrus_declares() {
        let tokens = resolve_all(LanguageId::Go, "a, ok := m[k]", &ParserConfig::default());
        assert_eq!(
            category_of(&tokens, ":="),
            TokenCategory::Operator(OperatorKind::Declare)
        );
    }

    #[test]
    fn test_go_star_pointer_vs_multiply() {
        let config = ParserConfig::default();
        let pointer = resolve_all(LanguageId::Go, "x = *p", &config);
        assert_eq!(
            category_of(&pointer, "*"),
            TokenCategory::Operator(OperatorKind::Pointer)
        );
        let multiply = resolve_all(LanguageId::Go, "x = a * b", &config);
        assert_eq!(
            category_of(&multiply, "*"),
            TokenCategory::Operator(OperatorKind::Arithmetic)
        );
    }

    #[test]
    fn test_go_type_keyword_vs_identifier() {
        let config = ParserConfig::default();
        let decl = resolve_all(LanguageId::Go, "type Foo struct {}", &config);
        assert_eq!(
            category_of(&decl, "type"),
            TokenCategory::Keyword(KeywordKind::Type)
        );
        let ident = resolve_all(LanguageId::Go, "x = type + 1", &config);
        assert_eq!(category_of(&ident, "type"), TokenCategory::Identifier);
    }

    #[test]
    fn test_java_generic_by_scout() {
        let config = ParserConfig::default();
        let generic = resolve_all(LanguageId::Java, "List<String> xs;", &config);
        assert_eq!(
            category_of(&generic, "<"),
            TokenCategory::Operator(OperatorKind::Generic)
        );
        let comparison = resolve_all(LanguageId::Java, "x = a < b;", &config);
        assert_eq!(
            category_of(&comparison, "<"),
            TokenCategory::Operator(OperatorKind::Comparison)
        );
    }

    #[test]
    fn test_js_async_contextual() {
        let config = ParserConfig::default();
        let modifier = resolve_all(LanguageId::JavaScript, "async function f() {}", &config);
        assert_eq!(
            category_of(&modifier, "async"),
            TokenCategory::Keyword(KeywordKind::Modifier)
        );
        let ident = resolve_all(LanguageId::JavaScript, "async = 1", &config);
        assert_eq!(category_of(&ident, "async"), TokenCategory::Identifier);
    }

    #[test]
    fn test_feature_gate_demotes_keyword() {
        let mut config = ParserConfig::default();
        config.rules.allow_async = false;
        let tokens = resolve_all(LanguageId::JavaScript, "async function f() {}", &config);
        assert_eq!(category_of(&tokens, "async"), TokenCategory::Identifier);
    }

    #[test]
    fn test_python_walrus_and_decorator() {
        let config = ParserConfig::default();
        let tokens = resolve_all(LanguageId::Python, "if (n := len(xs)) > 10: pass", &config);
        assert_eq!(
            category_of(&tokens, ":="),
            TokenCategory::Operator(OperatorKind::Declare)
        );
        let deco = resolve_all(LanguageId::Python, "@cached\ndef f(): pass", &config);
        assert_eq!(
            category_of(&deco, "@"),
            TokenCategory::Operator(OperatorKind::Other)
        );
        let matmul = resolve_all(LanguageId::Python, "c = a @ b", &config);
        assert_eq!(
            category_of(&matmul, "@"),
            TokenCategory::Operator(OperatorKind::Arithmetic)
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let config = ParserConfig::default();
        let source = "type Foo struct { a *int }";
        let first = resolve_all(LanguageId::Go, source, &config);
        for _ in 0..3 {
            assert_eq!(resolve_all(LanguageId::Go, source, &config), first);
        }
    }
}
