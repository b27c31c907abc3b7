//! Statistical fallback for tokens no grammar rule resolves.
//!
//! The Prophet never overrides a rule. It votes among the grammar's declared
//! candidate categories using cheap local evidence and reports how lopsided
//! the vote was as a confidence score. Low-confidence verdicts surface as
//! ambiguity issues; in strict mode every Prophet verdict does.

use crate::grammar::ContextKind;
use crate::token::{OperatorKind, RawKind, RawToken, Token, TokenCategory};

/// Verdicts below this confidence are flagged as ambiguous.
pub const MIN_CONFIDENCE: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProphetVerdict {
    pub category: TokenCategory,
    /// 0-100; share of the vote the winning candidate took.
    pub confidence: u8,
}

impl ProphetVerdict {
    pub fn is_confident(&self) -> bool {
        self.confidence >= MIN_CONFIDENCE
    }
}

/// Pick the most plausible category among `candidates`, which must be in
/// grammar declaration order. `previous` is the nearest non-trivia resolved
/// token; `lookahead` the next raw token.
pub fn predict(
    candidates: &[TokenCategory],
    previous: Option<&Token>,
    lookahead: Option<&RawToken>,
    context: ContextKind,
) -> Option<ProphetVerdict> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(ProphetVerdict {
            category: candidates[0],
            confidence: 100,
        });
    }

    let mut scores: Vec<u32> = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let mut score = 0u32;
        if context_affinity(*candidate, context) {
            score += 3;
        }
        if boundary_fit(*candidate, previous, lookahead) {
            score += 2;
        }
        if index == 0 {
            score += 1;
        }
        scores.push(score);
    }

    let total: u32 = scores.iter().sum();
    let (winner, &best) = scores
        .iter()
        .enumerate()
        .max_by_key(|(index, score)| (**score, std::cmp::Reverse(*index)))?;
    let confidence = if total == 0 {
        0
    } else {
        ((best * 100) / total).min(100) as u8
    };
    Some(ProphetVerdict {
        category: candidates[winner],
        confidence,
    })
}

/// Does this category belong in the innermost structural context?
fn context_affinity(category: TokenCategory, context: ContextKind) -> bool {
    match context {
        ContextKind::TypePosition => matches!(
            category,
            TokenCategory::Operator(OperatorKind::Generic)
                | TokenCategory::Operator(OperatorKind::Pointer)
                | TokenCategory::Operator(OperatorKind::Reference)
                | TokenCategory::Keyword(_)
                | TokenCategory::Identifier
        ),
        ContextKind::Expression => matches!(
            category,
            TokenCategory::Operator(
                OperatorKind::Arithmetic
                    | OperatorKind::Comparison
                    | OperatorKind::Logical
                    | OperatorKind::Bitwise
                    | OperatorKind::Ternary
                    | OperatorKind::Access
            ) | TokenCategory::Identifier
                | TokenCategory::Number
        ),
        ContextKind::ClassBody => matches!(
            category,
            TokenCategory::Keyword(_) | TokenCategory::Identifier
        ),
        ContextKind::Parameters => matches!(
            category,
            TokenCategory::Identifier | TokenCategory::Punctuation(_)
        ),
        ContextKind::TemplateLiteral => matches!(category, TokenCategory::TemplateLiteral),
        ContextKind::TopLevel | ContextKind::Block | ContextKind::FunctionBody => {
            matches!(category, TokenCategory::Keyword(_))
        }
    }
}

/// Does this category fit the expression boundary implied by the neighbors?
/// After an expression end an infix reading fits; at the start of an
/// expression a prefix or operand reading fits.
fn boundary_fit(
    category: TokenCategory,
    previous: Option<&Token>,
    lookahead: Option<&RawToken>,
) -> bool {
    let after_expression = previous.map(|t| t.category.ends_expression()).unwrap_or(false);
    let operand_ahead = lookahead
        .map(|t| {
            matches!(
                t.kind,
                RawKind::Identifier | RawKind::Number | RawKind::StringLit | RawKind::Template
            )
        })
        .unwrap_or(false);

    match category {
        TokenCategory::Operator(
            OperatorKind::Arithmetic
            | OperatorKind::Comparison
            | OperatorKind::Logical
            | OperatorKind::Bitwise
            | OperatorKind::Assignment
            | OperatorKind::Access
            | OperatorKind::Ternary
            | OperatorKind::Range,
        ) => after_expression && operand_ahead,
        TokenCategory::Operator(
            OperatorKind::Pointer | OperatorKind::Reference | OperatorKind::Generic,
        ) => !after_expression || !operand_ahead,
        TokenCategory::Identifier | TokenCategory::Number | TokenCategory::StringLiteral => {
            !after_expression
        }
        TokenCategory::Keyword(_) => !after_expression,
        _ => false,
    }
}
