//! Blank-paper tokenizer.
//!
//! The scanner knows nothing about any language beyond what the compiled
//! grammar hands it: literal-region openers, symbol lexemes, and the keyword
//! table. Everything it cannot place becomes an Unknown token plus an issue;
//! the scan itself never fails.

use log::trace;

use crate::issue::{DiagnosticCode, IssueCollector};
use crate::registry::{CompiledGrammar, SymbolSection};
use crate::scout::{self, DEFAULT_CHAR_BUDGET};
use crate::token::{RawKind, RawToken, Span, TokenCategory};
use crate::grammar::{LiteralRegionDef, LiteralRegionKind};

/// Raw scan output: tokens, the whitespace gaps between them, and whether
/// the token budget cut the scan short.
#[derive(Debug)]
pub struct RawScan {
    pub tokens: Vec<RawToken>,
    pub whitespace: Vec<Span>,
    pub budget_hit: bool,
}

pub struct Tokenizer<'g> {
    grammar: &'g CompiledGrammar,
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammar: &'g CompiledGrammar) -> Tokenizer<'g> {
        Tokenizer { grammar }
    }

    /// Scan the whole source. Produces at most `max_tokens` tokens; hitting
    /// the cap records one budget issue and stops.
    pub fn scan(
        &self,
        source: &str,
        max_tokens: usize,
        issues: &mut IssueCollector<'_>,
    ) -> RawScan {
        let mut tokens = Vec::new();
        let mut whitespace = Vec::new();
        let mut budget_hit = false;
        let mut pos = 0;
        let mut line = 1;
        let mut column = 1;

        while pos < source.len() {
            if tokens.len() >= max_tokens {
                budget_hit = true;
                issues.emit(
                    DiagnosticCode::TokenBudgetExceeded,
                    Span::new(pos, source.len()),
                    format!("token budget of {max_tokens} exhausted; rest of input skipped"),
                );
                break;
            }

            let rest = &source[pos..];
            let first = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };

            if first.is_whitespace() {
                let end = rest
                    .char_indices()
                    .find(|(_, c)| !c.is_whitespace())
                    .map(|(i, _)| pos + i)
                    .unwrap_or(source.len());
                whitespace.push(Span::new(pos, end));
                advance(&source[pos..end], &mut line, &mut column);
                pos = end;
                continue;
            }

            if let Some(region) = self.grammar.match_region(rest) {
                let token = self.scan_region(source, pos, line, column, region, issues);
                advance(&source[pos..token.span.end], &mut line, &mut column);
                pos = token.span.end;
                tokens.push(token);
                continue;
            }

            if let Some((lexeme, section)) = self.grammar.match_symbol(rest) {
                let span = Span::new(pos, pos + lexeme.len());
                let resolved = if self.grammar.needs_disambiguation(lexeme) {
                    None
                } else {
                    match section {
                        SymbolSection::Operator => self
                            .grammar
                            .operator(lexeme)
                            .map(|def| TokenCategory::Operator(def.kind)),
                        SymbolSection::Punctuation => self
                            .grammar
                            .punctuation(lexeme)
                            .map(|def| TokenCategory::Punctuation(def.kind)),
                    }
                };
                tokens.push(RawToken {
                    lexeme: lexeme.to_string(),
                    kind: RawKind::Symbol,
                    span,
                    line,
                    column,
                    resolved,
                });
                column += lexeme.len();
                pos = span.end;
                continue;
            }

            if first.is_alphabetic() || first == '_' || first == '$' {
                let end = rest
                    .char_indices()
                    .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
                    .map(|(i, _)| pos + i)
                    .unwrap_or(source.len());
                let word = &source[pos..end];
                let token = match self.grammar.keyword(word) {
                    Some(def) => RawToken {
                        lexeme: word.to_string(),
                        kind: RawKind::Keyword,
                        span: Span::new(pos, end),
                        line,
                        column,
                        resolved: if self.grammar.needs_disambiguation(word) {
                            None
                        } else {
                            Some(TokenCategory::Keyword(def.category))
                        },
                    },
                    None => RawToken {
                        lexeme: word.to_string(),
                        kind: RawKind::Identifier,
                        span: Span::new(pos, end),
                        line,
                        column,
                        resolved: Some(TokenCategory::Identifier),
                    },
                };
                column += word.chars().count();
                pos = end;
                tokens.push(token);
                continue;
            }

            if first.is_ascii_digit() {
                let end = scan_number(source, pos);
                tokens.push(RawToken {
                    lexeme: source[pos..end].to_string(),
                    kind: RawKind::Number,
                    span: Span::new(pos, end),
                    line,
                    column,
                    resolved: Some(TokenCategory::Number),
                });
                column += end - pos;
                pos = end;
                continue;
            }

            // Nothing in the grammar claims this character.
            let width = first.len_utf8();
            let span = Span::new(pos, pos + width);
            issues.emit(
                DiagnosticCode::UnknownToken,
                span,
                format!("character `{first}` has no meaning in this grammar"),
            );
            tokens.push(RawToken {
                lexeme: first.to_string(),
                kind: RawKind::Unknown,
                span,
                line,
                column,
                resolved: Some(TokenCategory::Unknown),
            });
            column += 1;
            pos = span.end;
        }

        trace!(
            "scanned {} tokens, {} whitespace runs, budget_hit={}",
            tokens.len(),
            whitespace.len(),
            budget_hit
        );
        RawScan {
            tokens,
            whitespace,
            budget_hit,
        }
    }

    /// Lex one literal region starting at `pos`. Unterminated block regions
    /// swallow the remainder of the input and record one issue.
    fn scan_region(
        &self,
        source: &str,
        pos: usize,
        line: usize,
        column: usize,
        region: &LiteralRegionDef,
        issues: &mut IssueCollector<'_>,
    ) -> RawToken {
        let body_start = pos + region.pattern.len();
        let (kind, raw_kind, category) = match region.kind {
            LiteralRegionKind::Line => (region.kind, RawKind::Comment, TokenCategory::Comment),
            LiteralRegionKind::Block => (region.kind, RawKind::Comment, TokenCategory::Comment),
            LiteralRegionKind::String | LiteralRegionKind::Char => {
                (region.kind, RawKind::StringLit, TokenCategory::StringLiteral)
            }
            LiteralRegionKind::Template => {
                (region.kind, RawKind::Template, TokenCategory::TemplateLiteral)
            }
        };

        let report = match (&region.interpolation, kind) {
            (Some(interp), LiteralRegionKind::Template) => scout::find_terminator_nested(
                source,
                body_start,
                &region.end_pattern,
                region.escape.as_deref(),
                &interp.open,
                &interp.close,
                DEFAULT_CHAR_BUDGET,
            ),
            _ => scout::find_terminator(
                source,
                body_start,
                &region.end_pattern,
                region.escape.as_deref(),
                DEFAULT_CHAR_BUDGET,
            ),
        };

        let end = match report.found_at {
            // A line region ends *before* its newline; the newline stays in
            // the whitespace stream so reconstruction is lossless.
            Some(at) if kind == LiteralRegionKind::Line => at,
            Some(at) => at + region.end_pattern.len(),
            None if kind == LiteralRegionKind::Line => source.len(),
            None => {
                issues.emit(
                    DiagnosticCode::UnterminatedLiteral,
                    Span::new(pos, source.len()),
                    format!(
                        "literal opened with `{}` is never closed by `{}`",
                        region.pattern, region.end_pattern
                    ),
                );
                source.len()
            }
        };

        RawToken {
            lexeme: source[pos..end].to_string(),
            kind: raw_kind,
            span: Span::new(pos, end),
            line,
            column,
            resolved: Some(category),
        }
    }
}

/// Advance the line/column trackers over a consumed slice.
fn advance(slice: &str, line: &mut usize, column: &mut usize) {
    for c in slice.chars() {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}

/// Numbers: decimal with optional fraction and exponent, hex/octal/binary
/// prefixes, and digit-separating underscores.
fn scan_number(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut pos = start;
    if bytes[pos] == b'0' && pos + 1 < source.len() {
        let prefix = bytes[pos + 1].to_ascii_lowercase();
        if prefix == b'x' || prefix == b'o' || prefix == b'b' {
            pos += 2;
            while pos < source.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            return pos;
        }
    }
    while pos < source.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
        pos += 1;
    }
    // Fraction only when a digit follows the dot, so `1..2` stays a range.
    if pos + 1 < source.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
        pos += 1;
        while pos < source.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
            pos += 1;
        }
    }
    if pos < source.len() && (bytes[pos] | 0x20) == b'e' {
        let mut exp = pos + 1;
        if exp < source.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < source.len() && bytes[exp].is_ascii_digit() {
            pos = exp;
            while pos < source.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    pos
}
