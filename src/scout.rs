//! Bounded forward-lookahead probes.
//!
//! Two probes, one over characters (literal terminators) and one over raw
//! tokens (balanced delimiters). Both carry a hard budget and always
//! terminate within it, which is what keeps the tokenizer and disambiguator
//! linear on pathological input such as thousands of unmatched `<`.

use crate::grammar::ScoutProbe;
use crate::token::RawToken;

/// Default cap on tokens a balanced-delimiter probe may inspect.
pub const DEFAULT_TOKEN_BUDGET: usize = 256;

/// Default cap on bytes a terminator probe may inspect beyond the opener.
pub const DEFAULT_CHAR_BUDGET: usize = 1 << 20;

/// Result of a probe: where the target was found, and how much of the budget
/// the scan consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoutReport {
    pub found_at: Option<usize>,
    pub scanned: usize,
}

impl ScoutReport {
    pub fn found(&self) -> bool {
        self.found_at.is_some()
    }
}

/// Scan forward from byte offset `from` for `end_pattern`, honoring an
/// optional escape prefix. Returns the byte offset where the terminator
/// begins. The scan inspects at most `budget` bytes.
pub fn find_terminator(
    source: &str,
    from: usize,
    end_pattern: &str,
    escape: Option<&str>,
    budget: usize,
) -> ScoutReport {
    let bytes = source.as_bytes();
    let pattern = end_pattern.as_bytes();
    let esc = escape.map(|e| e.as_bytes());
    let limit = source.len().min(from.saturating_add(budget));
    let mut pos = from;
    while pos < limit {
        if let Some(esc) = esc {
            if bytes[pos..].starts_with(esc) && pos + esc.len() < source.len() {
                // Skip the escape prefix and the escaped character.
                let skip = esc.len()
                    + source[pos + esc.len()..]
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(1);
                pos += skip;
                continue;
            }
        }
        if bytes[pos..].starts_with(pattern) {
            return ScoutReport {
                found_at: Some(pos),
                scanned: pos - from,
            };
        }
        pos += 1;
    }
    ScoutReport {
        found_at: None,
        scanned: limit - from,
    }
}

/// Scan forward from byte offset `from` for `end_pattern` while tracking
/// nesting of an interpolation pair, so a terminator inside `${ ... }` does
/// not close the enclosing template.
pub fn find_terminator_nested(
    source: &str,
    from: usize,
    end_pattern: &str,
    escape: Option<&str>,
    open: &str,
    close: &str,
    budget: usize,
) -> ScoutReport {
    let bytes = source.as_bytes();
    let pattern = end_pattern.as_bytes();
    let esc = escape.map(|e| e.as_bytes());
    let open_b = open.as_bytes();
    let close_b = close.as_bytes();
    let limit = source.len().min(from.saturating_add(budget));
    let mut pos = from;
    let mut depth: usize = 0;
    while pos < limit {
        if let Some(esc) = esc {
            if bytes[pos..].starts_with(esc) && pos + esc.len() < source.len() {
                let skip = esc.len()
                    + source[pos + esc.len()..]
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(1);
                pos += skip;
                continue;
            }
        }
        if bytes[pos..].starts_with(open_b) {
            depth += 1;
            pos += open_b.len();
            continue;
        }
        if depth > 0 && bytes[pos..].starts_with(close_b) {
            depth -= 1;
            pos += close_b.len();
            continue;
        }
        if depth == 0 && bytes[pos..].starts_with(pattern) {
            return ScoutReport {
                found_at: Some(pos),
                scanned: pos - from,
            };
        }
        pos += 1;
    }
    ScoutReport {
        found_at: None,
        scanned: limit - from,
    }
}

/// Scan raw tokens starting *after* `from` for the balanced closer of the
/// probe's `open`/`close` pair, stopping early at any `stopAt` lexeme seen at
/// depth zero, at a line change when `sameLine` is set, or when the token
/// budget runs out. The token at `from` is assumed to be the first opener.
pub fn find_balanced(tokens: &[RawToken], from: usize, probe: &ScoutProbe) -> ScoutReport {
    let start_line = tokens.get(from).map(|t| t.line).unwrap_or(0);
    let mut depth: usize = 1;
    let mut scanned = 0;
    for (index, token) in tokens.iter().enumerate().skip(from + 1) {
        if scanned >= probe.budget {
            break;
        }
        scanned += 1;
        if probe.same_line && token.line != start_line {
            break;
        }
        if token.lexeme == probe.open {
            depth += 1;
        } else if token.lexeme == probe.close {
            depth -= 1;
            if depth == 0 {
                return ScoutReport {
                    found_at: Some(index),
                    scanned,
                };
            }
        } else if depth == 1 && probe.stop_at.iter().any(|s| *s == token.lexeme) {
            break;
        }
    }
    ScoutReport {
        found_at: None,
        scanned,
    }
}
