use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum VigilError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarLoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Strict(#[from] StrictParseError),
}

/// The only failure the engine raises synchronously. A missing or invalid
/// grammar is a configuration defect, not a recoverable parse issue.
#[derive(Error, Debug, Diagnostic)]
pub enum GrammarLoadError {
    #[error("Malformed grammar file for {language}")]
    #[diagnostic(
        code(registry::malformed_grammar),
        help("The grammar JSON could not be deserialized. Category and type tags must come from the closed tag sets.")
    )]
    MalformedGrammar {
        language: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("Deserialization failed here")]
        span: SourceSpan,
        message: String,
    },

    #[error("Conflicting definitions for `{lexeme}` in the {language} grammar")]
    #[diagnostic(
        code(registry::conflicting_lexeme),
        help("A lexeme declared with multiple incompatible interpretations must carry disambiguation rules connecting them.")
    )]
    ConflictingLexeme {
        language: String,
        lexeme: String,
        first: String,
        second: String,
    },

    #[error("Invalid disambiguation rule for `{lexeme}` in the {language} grammar")]
    #[diagnostic(
        code(registry::invalid_rule),
        help("Rules need either `then` with at least one condition, or an unconditional `default`; referenced lexemes must be declared by the grammar.")
    )]
    InvalidRule {
        language: String,
        lexeme: String,
        reason: String,
    },

    #[error("Contextual definition `{lexeme}` in the {language} grammar has no disambiguation rules")]
    #[diagnostic(
        code(registry::unresolvable_contextual),
        help("A definition marked `contextual` is ambiguous by construction and must declare how to resolve itself.")
    )]
    UnresolvableContextual { language: String, lexeme: String },

    #[error("Grammar for {language} registered twice")]
    #[diagnostic(code(registry::duplicate_language))]
    DuplicateLanguage { language: String },

    #[error("No grammar registered for {language}")]
    #[diagnostic(
        code(registry::unknown_language),
        help("Register a grammar dictionary for this language before parsing.")
    )]
    UnknownLanguage { language: String },
}

/// Returned by the strict entry points after a parse ran to completion with
/// issues and `throwOnError` was set. The parse itself never aborts.
#[derive(Error, Debug, Diagnostic)]
#[error("Parse completed with {issue_count} issue(s); first: {first_issue}")]
#[diagnostic(
    code(parse::issues_present),
    help("The engine recovered and produced a full result; rerun without `throwOnError` to inspect it.")
)]
pub struct StrictParseError {
    pub first_issue: String,
    pub issue_count: usize,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("First issue recorded here")]
    pub span: SourceSpan,
}
