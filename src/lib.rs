//! vigil-core: grammar-driven tokenization and context disambiguation.
//!
//! The engine reads source text in any registered language and produces a
//! fully classified token stream, a structural nesting skeleton, and a list
//! of recovered diagnostics. It never builds a syntax tree and it never
//! gives up: malformed input degrades into `Unknown` tokens and issues, not
//! errors.
//!
//! The pipeline has four stages. The [`registry::GrammarRegistry`] loads and
//! validates grammar dictionaries up front, the only place failures are
//! loud. The [`tokenizer::Tokenizer`] performs a blank-paper scan driven
//! entirely by grammar data. The [`disambiguator::Disambiguator`] settles
//! ambiguous drafts with grammar rules first and the statistical
//! [`prophet`] as fallback. The [`assembler::Assembler`] pairs delimiters
//! into a skeleton and maintains the context stack the disambiguator reads.
//!
//! ```no_run
//! use vigil_core::{parse, GrammarRegistry, LanguageId, ParserConfig};
//!
//! # fn main() -> Result<(), vigil_core::VigilError> {
//! let registry = GrammarRegistry::with_builtin_grammars()?;
//! let result = parse(&registry, LanguageId::Go, "a, ok := m[k]", &ParserConfig::default())?;
//! for token in &result.tokens {
//!     println!("{:?} {:?}", token.lexeme, token.category);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod assembler;
pub mod cache;
pub mod config;
pub mod disambiguator;
pub mod error;
pub mod grammar;
pub mod issue;
pub mod prophet;
pub mod registry;
pub mod scout;
pub mod token;
pub mod tokenizer;
pub mod utils;

pub use api::{parse, parse_with_reporter, Analyzer, CancelToken, ParseResult, TokenStats};
pub use assembler::{NodeKind, StructureNode};
pub use config::{LanguageRules, ParserConfig};
pub use error::{GrammarLoadError, StrictParseError, VigilError};
pub use grammar::{ContextKind, GrammarDictionary, LanguageId};
pub use issue::{DiagnosticCode, IssueKind, NullReporter, ParseIssue, Reporter};
pub use registry::GrammarRegistry;
pub use token::{KeywordKind, OperatorKind, PunctuationKind, Span, Token, TokenCategory};
