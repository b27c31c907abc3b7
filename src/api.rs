//! Public parse surface: one-shot `parse`, the collaborator-aware
//! `parse_with_reporter`, and the caching [`Analyzer`] front end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use miette::NamedSource;
use serde::Serialize;

use crate::assembler::{Assembler, StructureNode};
use crate::cache::{fingerprint, ParseCache};
use crate::config::ParserConfig;
use crate::disambiguator::{Disambiguator, ResolvedVia};
use crate::error::{StrictParseError, VigilError};
use crate::grammar::LanguageId;
use crate::issue::{DiagnosticCode, IssueCollector, NullReporter, ParseIssue, Reporter};
use crate::registry::GrammarRegistry;
use crate::token::{Span, Token, TokenCategory, TokenStream};
use crate::tokenizer::Tokenizer;

/// Cooperative cancellation handle. Cloneable; any clone cancels the parse
/// it was passed to at the next token boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Aggregate token counts for a completed parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub total: usize,
    pub keywords: usize,
    pub operators: usize,
    pub punctuation: usize,
    pub identifiers: usize,
    pub numbers: usize,
    pub strings: usize,
    pub comments: usize,
    pub unknown: usize,
    pub issues: usize,
    /// Structure nodes in the skeleton, all depths.
    pub structures: usize,
    /// Deepest tracked nesting level, 1-based; 0 for flat input.
    pub max_depth: usize,
}

/// Everything a completed parse produced. A parse always completes; whether
/// issues were recovered along the way is visible in `issues`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub language: LanguageId,
    pub tokens: Vec<Token>,
    pub structure: Vec<StructureNode>,
    pub issues: Vec<ParseIssue>,
    /// Includes issues dropped past the accumulation cap.
    pub total_issues: usize,
    /// True when the token budget cut the scan short.
    pub truncated: bool,
    #[serde(skip)]
    whitespace: Vec<Span>,
    #[serde(skip)]
    source: String,
}

impl ParseResult {
    /// Rebuild the exact input from token lexemes and the recorded
    /// whitespace gaps. Byte-for-byte identical to the original source.
    pub fn reconstruct_source(&self) -> String {
        let mut pieces: Vec<(usize, &str)> = self
            .tokens
            .iter()
            .map(|t| (t.span.start, t.lexeme.as_str()))
            .chain(
                self.whitespace
                    .iter()
                    .map(|s| (s.start, &self.source[s.start..s.end])),
            )
            .collect();
        pieces.sort_by_key(|(start, _)| *start);
        let mut out = String::with_capacity(self.source.len());
        for (_, piece) in pieces {
            out.push_str(piece);
        }
        out
    }

    pub fn stats(&self) -> TokenStats {
        let mut stats = TokenStats {
            total: self.tokens.len(),
            issues: self.total_issues,
            ..TokenStats::default()
        };
        for token in &self.tokens {
            match token.category {
                TokenCategory::Keyword(_) => stats.keywords += 1,
                TokenCategory::Operator(_) => stats.operators += 1,
                TokenCategory::Punctuation(_) => stats.punctuation += 1,
                TokenCategory::Identifier => stats.identifiers += 1,
                TokenCategory::Number => stats.numbers += 1,
                TokenCategory::StringLiteral | TokenCategory::TemplateLiteral => {
                    stats.strings += 1
                }
                TokenCategory::Comment => stats.comments += 1,
                TokenCategory::Unknown => stats.unknown += 1,
            }
        }
        fn walk(nodes: &[StructureNode], stats: &mut TokenStats) {
            for node in nodes {
                stats.structures += 1;
                stats.max_depth = stats.max_depth.max(node.depth + 1);
                walk(&node.children, stats);
            }
        }
        walk(&self.structure, &mut stats);
        stats
    }

    /// Map a byte offset into the parsed source to a 1-based line/column
    /// pair, e.g. for locating an issue span.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let starts = crate::utils::line_starts(&self.source);
        crate::utils::line_col(&starts, offset)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Parse `source` as `language`. Never fails for anything in the source
/// itself; only a missing grammar or the strict-entry contract produce an
/// error.
pub fn parse(
    registry: &GrammarRegistry,
    language: LanguageId,
    source: &str,
    config: &ParserConfig,
) -> Result<ParseResult, VigilError> {
    parse_with_reporter(registry, language, source, config, &NullReporter, None)
}

/// Full-control entry point: inject the issue reporter collaborator and an
/// optional cancellation token.
pub fn parse_with_reporter(
    registry: &GrammarRegistry,
    language: LanguageId,
    source: &str,
    config: &ParserConfig,
    reporter: &dyn Reporter,
    cancel: Option<&CancelToken>,
) -> Result<ParseResult, VigilError> {
    let grammar = registry.grammar(language)?;
    let mut collector = IssueCollector::new(config.max_errors, config.collect_errors, reporter);

    let scan = Tokenizer::new(grammar).scan(source, config.max_tokens, &mut collector);
    let disambiguator = Disambiguator::new(grammar, config);
    let mut assembler = Assembler::new(grammar, config.max_depth);
    let mut stream = TokenStream::new();

    for (index, raw) in scan.tokens.iter().enumerate() {
        if let Some(cancel) = cancel {
            if cancel.is_cancelled() {
                collector.emit(
                    DiagnosticCode::ParseCancelled,
                    raw.span,
                    "parse cancelled; result covers the input consumed so far",
                );
                break;
            }
        }

        let category = match raw.resolved {
            Some(category) => category,
            None => {
                let resolution =
                    disambiguator.resolve(&scan.tokens, index, &stream, assembler.contexts());
                if resolution.via == ResolvedVia::Prophet
                    && (config.strict_mode || resolution.is_ambiguous())
                {
                    collector.emit(
                        DiagnosticCode::AmbiguousToken,
                        raw.span,
                        format!(
                            "`{}` resolved by prediction with {}% confidence",
                            raw.lexeme, resolution.confidence
                        ),
                    );
                }
                resolution.category
            }
        };

        if config.strict_mode && category == TokenCategory::Identifier {
            if let Some(intended) = grammar.typo_hint(&raw.lexeme) {
                collector.emit(
                    DiagnosticCode::UnknownToken,
                    raw.span,
                    format!("`{}` looks like a misspelling of `{intended}`", raw.lexeme),
                );
            }
        }

        let token = Token::new(
            raw.lexeme.clone(),
            category,
            raw.span,
            raw.line,
            raw.column,
            language,
        );
        assembler.consume(&token, &mut collector);
        stream.push(token);
    }

    let structure = assembler.finish(&mut collector);
    let total_issues = collector.total_seen();
    let issues = collector.into_issues();
    debug!(
        "parsed {} bytes of {}: {} tokens, {} structure roots, {} issues",
        source.len(),
        language,
        stream.len(),
        structure.len(),
        total_issues
    );

    let result = ParseResult {
        language,
        tokens: stream.into_tokens(),
        structure,
        issues,
        total_issues,
        truncated: scan.budget_hit,
        whitespace: scan.whitespace,
        source: source.to_string(),
    };

    if config.throw_on_error && result.total_issues > 0 {
        let first = result
            .issues
            .first()
            .map(|i| (i.message.clone(), i.span))
            .unwrap_or_else(|| ("issue details not collected".to_string(), Span::new(0, 0)));
        return Err(VigilError::Strict(StrictParseError {
            first_issue: first.0,
            issue_count: result.total_issues,
            src: NamedSource::new(language.name(), source.to_string()),
            span: first.1.into(),
        }));
    }
    Ok(result)
}

/// Reusable front end owning the registry and the result cache.
pub struct Analyzer {
    registry: GrammarRegistry,
    config: ParserConfig,
    cache: ParseCache,
}

impl Analyzer {
    /// Analyzer over the built-in grammars.
    pub fn new(config: ParserConfig) -> Result<Analyzer, VigilError> {
        Ok(Analyzer::with_registry(
            GrammarRegistry::with_builtin_grammars()?,
            config,
        ))
    }

    pub fn with_registry(registry: GrammarRegistry, config: ParserConfig) -> Analyzer {
        let cache = ParseCache::new(config.cache_size);
        Analyzer {
            registry,
            config,
            cache,
        }
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        language: LanguageId,
        source: &str,
    ) -> Result<Arc<ParseResult>, VigilError> {
        if !self.config.enable_caching {
            return parse(&self.registry, language, source, &self.config).map(Arc::new);
        }
        let key = fingerprint(language, source, &self.config);
        self.cache
            .get_or_compute(key, || parse(&self.registry, language, source, &self.config))
    }
}
