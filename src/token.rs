//! Token model: spans, category taxonomy, raw drafts, and the resolved
//! output stream.
//!
//! Categories form a closed taxonomy. Grammar files select them by tag
//! string at load time; nothing downstream ever matches on free-form text.

use serde::{Deserialize, Serialize};

use crate::grammar::LanguageId;

/// Half-open byte range into the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> miette::SourceSpan {
        (span.start, span.len()).into()
    }
}

/// Semantic role of a keyword, as declared by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    Control,
    Iteration,
    Variable,
    Function,
    Class,
    Module,
    Exception,
    Type,
    Literal,
    Modifier,
    Operator,
    Contextual,
    Reserved,
}

/// Semantic role of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorKind {
    Arithmetic,
    Comparison,
    Logical,
    Assignment,
    Bitwise,
    Arrow,
    Generic,
    Ternary,
    Access,
    Spread,
    Range,
    Declare,
    Pointer,
    Reference,
    Other,
}

/// Structural punctuation. Openers and closers pair up through `closer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PunctuationKind {
    BraceOpen,
    BraceClose,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    Semicolon,
    Comma,
    Colon,
    Dot,
    At,
    Other,
}

impl PunctuationKind {
    pub fn closer(&self) -> Option<PunctuationKind> {
        match self {
            PunctuationKind::BraceOpen => Some(PunctuationKind::BraceClose),
            PunctuationKind::ParenOpen => Some(PunctuationKind::ParenClose),
            PunctuationKind::BracketOpen => Some(PunctuationKind::BracketClose),
            _ => None,
        }
    }

    pub fn is_opener(&self) -> bool {
        self.closer().is_some()
    }

    pub fn is_closer(&self) -> bool {
        matches!(
            self,
            PunctuationKind::BraceClose | PunctuationKind::ParenClose | PunctuationKind::BracketClose
        )
    }
}

/// Final token classification. One of these per emitted token, always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "role")]
pub enum TokenCategory {
    Keyword(KeywordKind),
    Operator(OperatorKind),
    Punctuation(PunctuationKind),
    Identifier,
    Number,
    StringLiteral,
    TemplateLiteral,
    Comment,
    Unknown,
}

impl TokenCategory {
    /// Compact single-bit class encoding carried on every token.
    pub fn bit(&self) -> u16 {
        match self {
            TokenCategory::Keyword(_) => 1 << 0,
            TokenCategory::Operator(_) => 1 << 1,
            TokenCategory::Punctuation(_) => 1 << 2,
            TokenCategory::Identifier => 1 << 3,
            TokenCategory::Number => 1 << 4,
            TokenCategory::StringLiteral => 1 << 5,
            TokenCategory::TemplateLiteral => 1 << 6,
            TokenCategory::Comment => 1 << 7,
            TokenCategory::Unknown => 1 << 8,
        }
    }

    /// Comments never participate in disambiguation windows.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenCategory::Comment)
    }

    /// Whether a token of this category can legally end an expression. This
    /// is the pivot the classic `<` and `*` ambiguities turn on.
    pub fn ends_expression(&self) -> bool {
        match self {
            TokenCategory::Identifier
            | TokenCategory::Number
            | TokenCategory::StringLiteral
            | TokenCategory::TemplateLiteral => true,
            TokenCategory::Keyword(KeywordKind::Literal) => true,
            TokenCategory::Punctuation(p) => p.is_closer(),
            _ => false,
        }
    }
}

/// A fully classified token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub lexeme: String,
    pub category: TokenCategory,
    /// Compact class bits, see [`TokenCategory::bit`].
    pub bits: u16,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    pub language: LanguageId,
}

impl Token {
    pub fn new(
        lexeme: impl Into<String>,
        category: TokenCategory,
        span: Span,
        line: usize,
        column: usize,
        language: LanguageId,
    ) -> Token {
        Token {
            lexeme: lexeme.into(),
            category,
            bits: category.bit(),
            span,
            line,
            column,
            language,
        }
    }
}

/// Lexical shape of a raw token, before context resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Identifier,
    Keyword,
    Number,
    StringLit,
    Template,
    Comment,
    Symbol,
    Unknown,
}

/// Tokenizer output. Unambiguous tokens carry their category in `resolved`;
/// drafts leave it empty for the disambiguator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub lexeme: String,
    pub kind: RawKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    pub resolved: Option<TokenCategory>,
}

impl RawToken {
    pub fn is_draft(&self) -> bool {
        self.resolved.is_none()
    }
}

/// Growing stream of resolved tokens with a backward-looking window.
#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    pub fn new() -> TokenStream {
        TokenStream::default()
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.cursor);
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Most recent non-trivia token, then the one before it, up to `n`.
    /// Index 0 is the immediately preceding token.
    pub fn trailing_window(&self, n: usize) -> Vec<&Token> {
        self.tokens
            .iter()
            .rev()
            .filter(|t| !t.category.is_trivia())
            .take(n)
            .collect()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(lexeme: &str, category: TokenCategory) -> Token {
        Token::new(lexeme, category, Span::new(0, lexeme.len()), 1, 1, LanguageId::JavaScript)
    }

    #[test]
    fn test_category_bits_disjoint() {
        let bits = [
            TokenCategory::Keyword(KeywordKind::Control).bit(),
            TokenCategory::Operator(OperatorKind::Arrow).bit(),
            TokenCategory::Punctuation(PunctuationKind::Comma).bit(),
            TokenCategory::Identifier.bit(),
            TokenCategory::Number.bit(),
            TokenCategory::StringLiteral.bit(),
            TokenCategory::TemplateLiteral.bit(),
            TokenCategory::Comment.bit(),
            TokenCategory::Unknown.bit(),
        ];
        let mut combined = 0u16;
        for bit in bits {
            assert_eq!(combined & bit, 0);
            combined |= bit;
        }
    }

    #[test]
    fn test_trailing_window_skips_comments() {
        let mut stream = TokenStream::new();
        stream.push(token("a", TokenCategory::Identifier));
        stream.push(token("// c", TokenCategory::Comment));
        stream.push(token("=", TokenCategory::Operator(OperatorKind::Assignment)));
        let window = stream.trailing_window(2);
        assert_eq!(window[0].lexeme, "=");
        assert_eq!(window[1].lexeme, "a");
    }

    #[test]
    fn test_expression_enders() {
        assert!(TokenCategory::Identifier.ends_expression());
        assert!(TokenCategory::Punctuation(PunctuationKind::ParenClose).ends_expression());
        assert!(TokenCategory::Keyword(KeywordKind::Literal).ends_expression());
        assert!(!TokenCategory::Operator(OperatorKind::Comparison).ends_expression());
        assert!(!TokenCategory::Punctuation(PunctuationKind::ParenOpen).ends_expression());
    }
}
