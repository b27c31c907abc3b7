//! Grammar data model: the deserialized shape of a grammar dictionary and
//! the compiled rule form the disambiguator interprets.
//!
//! Dictionaries are pure data. Every tag string in a grammar file maps into
//! a closed enum here at load time; an unrecognized tag is a load error, not
//! a silent fallthrough.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scout::DEFAULT_TOKEN_BUDGET;
use crate::token::{
    KeywordKind, OperatorKind, PunctuationKind, RawKind, RawToken, Token, TokenCategory,
};

/// Built-in language identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Python,
    Java,
    C,
}

impl LanguageId {
    pub const ALL: [LanguageId; 7] = [
        LanguageId::JavaScript,
        LanguageId::TypeScript,
        LanguageId::Go,
        LanguageId::Rust,
        LanguageId::Python,
        LanguageId::Java,
        LanguageId::C,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LanguageId::JavaScript => "javascript",
            LanguageId::TypeScript => "typescript",
            LanguageId::Go => "go",
            LanguageId::Rust => "rust",
            LanguageId::Python => "python",
            LanguageId::Java => "java",
            LanguageId::C => "c",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LanguageId {
    type Err = String;

    fn from_str(s: &str) -> Result<LanguageId, String> {
        match s.to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(LanguageId::JavaScript),
            "typescript" | "ts" => Ok(LanguageId::TypeScript),
            "go" | "golang" => Ok(LanguageId::Go),
            "rust" | "rs" => Ok(LanguageId::Rust),
            "python" | "py" => Ok(LanguageId::Python),
            "java" => Ok(LanguageId::Java),
            "c" => Ok(LanguageId::C),
            other => Err(format!("unknown language `{other}`")),
        }
    }
}

/// Structural contexts tracked by the assembler and consulted by rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextKind {
    TopLevel,
    Block,
    ClassBody,
    FunctionBody,
    Expression,
    Parameters,
    TypePosition,
    TemplateLiteral,
}

/// Feature gates a contextual keyword may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureRule {
    AllowAsync,
    AllowAwait,
    AllowGenerators,
    AllowClasses,
    AllowModules,
}

/// What a rule condition matches a neighboring token against: either a
/// token class or a concrete lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClass {
    Identifier,
    Number,
    StringLit,
    Keyword,
    Operator,
    Punctuation,
    ExpressionEnd,
    StartOfInput,
    Lexeme(String),
}

impl<'de> Deserialize<'de> for TokenClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<TokenClass, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "identifier" => TokenClass::Identifier,
            "number" => TokenClass::Number,
            "string" => TokenClass::StringLit,
            "keyword" => TokenClass::Keyword,
            "operator" => TokenClass::Operator,
            "punctuation" => TokenClass::Punctuation,
            "expressionEnd" => TokenClass::ExpressionEnd,
            "startOfInput" => TokenClass::StartOfInput,
            _ => TokenClass::Lexeme(tag),
        })
    }
}

impl TokenClass {
    /// Match against a resolved token from the trailing window. `None`
    /// means start of input.
    pub fn matches_resolved(&self, token: Option<&Token>) -> bool {
        let Some(token) = token else {
            return matches!(self, TokenClass::StartOfInput);
        };
        match self {
            TokenClass::Identifier => token.category == TokenCategory::Identifier,
            TokenClass::Number => token.category == TokenCategory::Number,
            TokenClass::StringLit => matches!(
                token.category,
                TokenCategory::StringLiteral | TokenCategory::TemplateLiteral
            ),
            TokenClass::Keyword => matches!(token.category, TokenCategory::Keyword(_)),
            TokenClass::Operator => matches!(token.category, TokenCategory::Operator(_)),
            TokenClass::Punctuation => matches!(token.category, TokenCategory::Punctuation(_)),
            TokenClass::ExpressionEnd => token.category.ends_expression(),
            TokenClass::StartOfInput => false,
            TokenClass::Lexeme(lexeme) => token.lexeme == *lexeme,
        }
    }

    /// Match against a raw lookahead token. `None` means end of input.
    pub fn matches_raw(&self, token: Option<&RawToken>) -> bool {
        let Some(token) = token else {
            return false;
        };
        match self {
            TokenClass::Identifier => token.kind == RawKind::Identifier,
            TokenClass::Number => token.kind == RawKind::Number,
            TokenClass::StringLit => {
                matches!(token.kind, RawKind::StringLit | RawKind::Template)
            }
            TokenClass::Keyword => token.kind == RawKind::Keyword,
            TokenClass::Operator | TokenClass::Punctuation => token.kind == RawKind::Symbol,
            TokenClass::ExpressionEnd => {
                matches!(
                    token.kind,
                    RawKind::Identifier | RawKind::Number | RawKind::StringLit | RawKind::Template
                ) || token.lexeme == ")"
                    || token.lexeme == "]"
            }
            TokenClass::StartOfInput => false,
            TokenClass::Lexeme(lexeme) => token.lexeme == *lexeme,
        }
    }
}

/// A category selected by tag string in a rule's `then`/`default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTag(pub TokenCategory);

impl<'de> Deserialize<'de> for CategoryTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<CategoryTag, D::Error> {
        let tag = String::deserialize(deserializer)?;
        category_from_tag(&tag)
            .map(CategoryTag)
            .ok_or_else(|| de::Error::custom(format!("unknown category tag `{tag}`")))
    }
}

/// The closed tag-to-category mapping used by rule outcomes.
pub fn category_from_tag(tag: &str) -> Option<TokenCategory> {
    Some(match tag {
        "identifier" => TokenCategory::Identifier,
        "number" => TokenCategory::Number,
        "string" => TokenCategory::StringLiteral,
        "template" => TokenCategory::TemplateLiteral,
        "comment" => TokenCategory::Comment,

        "control" => TokenCategory::Keyword(KeywordKind::Control),
        "iteration" => TokenCategory::Keyword(KeywordKind::Iteration),
        "variable" => TokenCategory::Keyword(KeywordKind::Variable),
        "function" => TokenCategory::Keyword(KeywordKind::Function),
        "class" => TokenCategory::Keyword(KeywordKind::Class),
        "module" => TokenCategory::Keyword(KeywordKind::Module),
        "exception" => TokenCategory::Keyword(KeywordKind::Exception),
        "type" => TokenCategory::Keyword(KeywordKind::Type),
        "literal" => TokenCategory::Keyword(KeywordKind::Literal),
        "modifier" => TokenCategory::Keyword(KeywordKind::Modifier),
        "operator" => TokenCategory::Keyword(KeywordKind::Operator),
        "contextual" => TokenCategory::Keyword(KeywordKind::Contextual),
        "reserved" => TokenCategory::Keyword(KeywordKind::Reserved),

        "arithmetic" => TokenCategory::Operator(OperatorKind::Arithmetic),
        "comparison" => TokenCategory::Operator(OperatorKind::Comparison),
        "logical" => TokenCategory::Operator(OperatorKind::Logical),
        "assignment" => TokenCategory::Operator(OperatorKind::Assignment),
        "bitwise" => TokenCategory::Operator(OperatorKind::Bitwise),
        "arrow" => TokenCategory::Operator(OperatorKind::Arrow),
        "generic" => TokenCategory::Operator(OperatorKind::Generic),
        "ternary" => TokenCategory::Operator(OperatorKind::Ternary),
        "access" => TokenCategory::Operator(OperatorKind::Access),
        "spread" => TokenCategory::Operator(OperatorKind::Spread),
        "range" => TokenCategory::Operator(OperatorKind::Range),
        "declare" => TokenCategory::Operator(OperatorKind::Declare),
        "pointer" => TokenCategory::Operator(OperatorKind::Pointer),
        "reference" => TokenCategory::Operator(OperatorKind::Reference),
        "other" => TokenCategory::Operator(OperatorKind::Other),

        "colon" => TokenCategory::Punctuation(PunctuationKind::Colon),
        "semicolon" => TokenCategory::Punctuation(PunctuationKind::Semicolon),
        "comma" => TokenCategory::Punctuation(PunctuationKind::Comma),
        "dot" => TokenCategory::Punctuation(PunctuationKind::Dot),
        "at" => TokenCategory::Punctuation(PunctuationKind::At),

        _ => return None,
    })
}

/// Declarative bounded lookahead attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScoutProbe {
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub stop_at: Vec<String>,
    #[serde(default)]
    pub same_line: bool,
    #[serde(default = "default_probe_budget")]
    pub budget: usize,
}

fn default_probe_budget() -> usize {
    DEFAULT_TOKEN_BUDGET
}

/// One disambiguation rule as written in a grammar file. Rules are ordered;
/// the first whose conditions all hold wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct DisambiguationRule {
    pub if_preceded_by: Vec<TokenClass>,
    pub if_followed_by: Vec<TokenClass>,
    pub not_preceded_by: Vec<TokenClass>,
    pub not_followed_by: Vec<TokenClass>,
    pub in_parent_context: Vec<ContextKind>,
    pub language: Option<LanguageId>,
    pub scout: Option<ScoutProbe>,
    pub then: Option<CategoryTag>,
    pub default: Option<CategoryTag>,
}

impl Default for DisambiguationRule {
    fn default() -> Self {
        DisambiguationRule {
            if_preceded_by: Vec::new(),
            if_followed_by: Vec::new(),
            not_preceded_by: Vec::new(),
            not_followed_by: Vec::new(),
            in_parent_context: Vec::new(),
            language: None,
            scout: None,
            then: None,
            default: None,
        }
    }
}

impl DisambiguationRule {
    pub fn has_conditions(&self) -> bool {
        !self.if_preceded_by.is_empty()
            || !self.if_followed_by.is_empty()
            || !self.not_preceded_by.is_empty()
            || !self.not_followed_by.is_empty()
            || !self.in_parent_context.is_empty()
            || self.language.is_some()
            || self.scout.is_some()
    }
}

/// Validated rule condition, ready for interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleCondition {
    PrecededBy(Vec<TokenClass>),
    FollowedBy(Vec<TokenClass>),
    NotPrecededBy(Vec<TokenClass>),
    NotFollowedBy(Vec<TokenClass>),
    InParentContext(Vec<ContextKind>),
    LanguageIs(LanguageId),
    BalancedAhead(ScoutProbe),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Then(TokenCategory),
    Default(TokenCategory),
}

/// A validated, interpretable rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub conditions: Vec<RuleCondition>,
    pub outcome: RuleOutcome,
}

impl CompiledRule {
    pub fn result_category(&self) -> TokenCategory {
        match self.outcome {
            RuleOutcome::Then(category) | RuleOutcome::Default(category) => category,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self.outcome, RuleOutcome::Default(_))
    }
}

/// A keyword entry in a grammar dictionary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeywordDef {
    pub category: KeywordKind,
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version_introduced: Option<String>,
    #[serde(default)]
    pub contextual: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub common_typos: Vec<String>,
    /// Structural context this keyword opens at its next `{` (or block
    /// opener); consumed by the assembler.
    #[serde(default)]
    pub push_context: Option<ContextKind>,
    /// Feature gate: when the session config disables it, the lexeme is an
    /// ordinary identifier.
    #[serde(default)]
    pub requires_rule: Option<FeatureRule>,
    #[serde(default)]
    pub disambiguation: Vec<DisambiguationRule>,
}

/// An operator entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperatorDef {
    #[serde(rename = "type")]
    pub kind: OperatorKind,
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version_introduced: Option<String>,
    #[serde(default)]
    pub contextual: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub push_context: Option<ContextKind>,
    #[serde(default)]
    pub disambiguation: Vec<DisambiguationRule>,
}

/// A punctuation entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PunctuationDef {
    #[serde(rename = "type")]
    pub kind: PunctuationKind,
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub push_context: Option<ContextKind>,
    #[serde(default)]
    pub disambiguation: Vec<DisambiguationRule>,
}

/// What a literal region lexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralRegionKind {
    Line,
    Block,
    String,
    Template,
    Char,
}

/// Interpolation pair active inside a template region, e.g. `${` / `}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InterpolationDef {
    pub open: String,
    pub close: String,
}

/// A literal region: comment, string, template, or char literal. The map key
/// in the grammar file is the opening pattern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LiteralRegionDef {
    pub kind: LiteralRegionKind,
    /// Opening pattern; filled from the map key at registration.
    #[serde(default)]
    pub pattern: String,
    pub end_pattern: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub escape: Option<String>,
    #[serde(default)]
    pub interpolation: Option<InterpolationDef>,
}

/// A whole language dictionary, as deserialized from a grammar file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrammarDictionary {
    pub language: LanguageId,
    pub version: String,
    #[serde(default)]
    pub keywords: BTreeMap<String, KeywordDef>,
    #[serde(default)]
    pub operators: BTreeMap<String, OperatorDef>,
    #[serde(default)]
    pub punctuation: BTreeMap<String, PunctuationDef>,
    #[serde(default)]
    pub comments: BTreeMap<String, LiteralRegionDef>,
}

impl GrammarDictionary {
    /// Whether any token section declares this lexeme.
    pub fn declares(&self, lexeme: &str) -> bool {
        self.keywords.contains_key(lexeme)
            || self.operators.contains_key(lexeme)
            || self.punctuation.contains_key(lexeme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Span;

    #[test]
    fn test_dictionary_deserializes() {
        let dict: GrammarDictionary = serde_json::from_str(
            r#"{
                "language": "go",
                "version": "1.22",
                "keywords": {
                    "func": {"category": "function", "source": "go-spec"}
                },
                "operators": {
                    ":=": {"type": "declare", "source": "go-spec"}
                },
                "punctuation": {
                    "{": {"type": "braceOpen", "source": "go-spec"}
                },
                "comments": {
                    "//": {"kind": "line", "endPattern": "\n"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(dict.language, LanguageId::Go);
        assert!(dict.declares("func"));
        assert!(dict.declares(":="));
        assert!(!dict.declares("chan"));
    }

    #[test]
    fn test_token_class_tags_and_lexemes() {
        let classes: Vec<TokenClass> =
            serde_json::from_str(r#"["identifier", "expressionEnd", ")", "=>"]"#).unwrap();
        assert_eq!(classes[0], TokenClass::Identifier);
        assert_eq!(classes[1], TokenClass::ExpressionEnd);
        assert_eq!(classes[2], TokenClass::Lexeme(")".to_string()));
        assert_eq!(classes[3], TokenClass::Lexeme("=>".to_string()));
    }

    #[test]
    fn test_category_tag_mapping() {
        assert_eq!(
            category_from_tag("generic"),
            Some(TokenCategory::Operator(OperatorKind::Generic))
        );
        assert_eq!(
            category_from_tag("type"),
            Some(TokenCategory::Keyword(KeywordKind::Type))
        );
        assert_eq!(category_from_tag("identifier"), Some(TokenCategory::Identifier));
        assert_eq!(
            category_from_tag("other"),
            Some(TokenCategory::Operator(OperatorKind::Other))
        );
        assert_eq!(category_from_tag("sparkly"), None);
    }

    #[test]
    fn test_scout_probe_defaults() {
        let probe: ScoutProbe =
            serde_json::from_str(r#"{"open": "<", "close": ">", "sameLine": true}"#).unwrap();
        assert_eq!(probe.budget, DEFAULT_TOKEN_BUDGET);
        assert!(probe.same_line);
        assert!(probe.stop_at.is_empty());
    }

    #[test]
    fn test_language_aliases() {
        assert_eq!("ts".parse::<LanguageId>().unwrap(), LanguageId::TypeScript);
        assert_eq!("Python".parse::<LanguageId>().unwrap(), LanguageId::Python);
        assert!("cobol".parse::<LanguageId>().is_err());
    }

    #[test]
    fn test_token_class_matches_start_of_input() {
        assert!(TokenClass::StartOfInput.matches_resolved(None));
        assert!(!TokenClass::Identifier.matches_resolved(None));
        let token = Token::new(
            "x",
            TokenCategory::Identifier,
            Span::new(0, 1),
            1,
            1,
            LanguageId::Go,
        );
        assert!(TokenClass::ExpressionEnd.matches_resolved(Some(&token)));
    }
}
