//! Grammar registry: loads, validates, and indexes grammar dictionaries.
//!
//! This is the only component permitted to fail loudly. After construction a
//! registry is read-only and safe for unsynchronized concurrent reads; parse
//! sessions borrow it by reference.

use std::collections::HashMap;

use log::debug;
use miette::NamedSource;

use crate::error::GrammarLoadError;
use crate::grammar::{
    CompiledRule, DisambiguationRule, GrammarDictionary, KeywordDef, LanguageId, LiteralRegionDef,
    OperatorDef, PunctuationDef, RuleCondition, RuleOutcome, TokenClass,
};
use crate::token::TokenCategory;

const JAVASCRIPT_GRAMMAR: &str = include_str!("../grammars/javascript.json");
const TYPESCRIPT_GRAMMAR: &str = include_str!("../grammars/typescript.json");
const GO_GRAMMAR: &str = include_str!("../grammars/go.json");
const RUST_GRAMMAR: &str = include_str!("../grammars/rust.json");
const PYTHON_GRAMMAR: &str = include_str!("../grammars/python.json");
const JAVA_GRAMMAR: &str = include_str!("../grammars/java.json");
const C_GRAMMAR: &str = include_str!("../grammars/c.json");

/// Which table a symbolic lexeme lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSection {
    Operator,
    Punctuation,
}

/// A candidate definition returned by `lookup`, in contract order: exact
/// keyword first, then operators, then punctuation.
#[derive(Debug, Clone, Copy)]
pub enum Definition<'g> {
    Keyword(&'g KeywordDef),
    Operator(&'g OperatorDef),
    Punctuation(&'g PunctuationDef),
}

impl<'g> Definition<'g> {
    pub fn declared_category(&self) -> TokenCategory {
        match self {
            Definition::Keyword(def) => TokenCategory::Keyword(def.category),
            Definition::Operator(def) => TokenCategory::Operator(def.kind),
            Definition::Punctuation(def) => TokenCategory::Punctuation(def.kind),
        }
    }

    pub fn raw_rules(&self) -> &'g [DisambiguationRule] {
        match self {
            Definition::Keyword(def) => &def.disambiguation,
            Definition::Operator(def) => &def.disambiguation,
            Definition::Punctuation(def) => &def.disambiguation,
        }
    }

    pub fn is_contextual(&self) -> bool {
        match self {
            Definition::Keyword(def) => def.contextual,
            Definition::Operator(def) => def.contextual,
            Definition::Punctuation(_) => false,
        }
    }

    /// Feature-gated keywords stay drafts even without rules; the gate is
    /// evaluated against the session config, not the grammar.
    pub fn is_feature_gated(&self) -> bool {
        matches!(self, Definition::Keyword(def) if def.requires_rule.is_some())
    }
}

/// One language's validated dictionary plus the indexes the tokenizer and
/// disambiguator consult on the hot path.
#[derive(Debug)]
pub struct CompiledGrammar {
    pub dictionary: GrammarDictionary,
    /// Operator and punctuation lexemes, longest first, for maximal munch.
    symbols: Vec<(String, SymbolSection)>,
    /// Literal-region openers, longest first (`"""` must beat `"`).
    regions: Vec<String>,
    /// Compiled rule lists per ambiguous lexeme.
    rules: HashMap<String, Vec<CompiledRule>>,
    /// Known typo -> intended keyword.
    typos: HashMap<String, String>,
}

impl CompiledGrammar {
    pub fn language(&self) -> LanguageId {
        self.dictionary.language
    }

    /// Longest operator/punctuation lexeme matching at the head of `rest`.
    pub fn match_symbol(&self, rest: &str) -> Option<(&str, SymbolSection)> {
        self.symbols
            .iter()
            .find(|(lexeme, _)| rest.starts_with(lexeme.as_str()))
            .map(|(lexeme, section)| (lexeme.as_str(), *section))
    }

    /// Longest literal-region opener matching at the head of `rest`.
    pub fn match_region(&self, rest: &str) -> Option<&LiteralRegionDef> {
        self.regions
            .iter()
            .find(|pattern| rest.starts_with(pattern.as_str()))
            .and_then(|pattern| self.dictionary.comments.get(pattern))
    }

    pub fn keyword(&self, word: &str) -> Option<&KeywordDef> {
        self.dictionary.keywords.get(word)
    }

    pub fn operator(&self, lexeme: &str) -> Option<&OperatorDef> {
        self.dictionary.operators.get(lexeme)
    }

    pub fn punctuation(&self, lexeme: &str) -> Option<&PunctuationDef> {
        self.dictionary.punctuation.get(lexeme)
    }

    /// Ordered candidate definitions for a lexeme: keyword, operator,
    /// punctuation. An empty result means "unknown".
    pub fn lookup(&self, lexeme: &str) -> Vec<Definition<'_>> {
        let mut candidates = Vec::new();
        if let Some(def) = self.dictionary.keywords.get(lexeme) {
            candidates.push(Definition::Keyword(def));
        }
        if let Some(def) = self.dictionary.operators.get(lexeme) {
            candidates.push(Definition::Operator(def));
        }
        if let Some(def) = self.dictionary.punctuation.get(lexeme) {
            candidates.push(Definition::Punctuation(def));
        }
        candidates
    }

    pub fn rules_for(&self, lexeme: &str) -> &[CompiledRule] {
        self.rules.get(lexeme).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidate categories for an ambiguous lexeme, declaration order:
    /// declared categories first, then rule outcomes, deduplicated.
    pub fn candidate_categories(&self, lexeme: &str) -> Vec<TokenCategory> {
        let mut categories = Vec::new();
        for def in self.lookup(lexeme) {
            let declared = def.declared_category();
            if !categories.contains(&declared) {
                categories.push(declared);
            }
        }
        for rule in self.rules_for(lexeme) {
            let category = rule.result_category();
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }

    /// The keyword this identifier is a known misspelling of, if any.
    pub fn typo_hint(&self, identifier: &str) -> Option<&str> {
        self.typos.get(identifier).map(String::as_str)
    }

    /// Draft tokens are those the disambiguator must finalize.
    pub fn needs_disambiguation(&self, lexeme: &str) -> bool {
        let candidates = self.lookup(lexeme);
        candidates.len() > 1
            || candidates.iter().any(|def| {
                def.is_contextual() || def.is_feature_gated() || !def.raw_rules().is_empty()
            })
    }
}

/// Process-wide, load-once grammar index. Explicitly constructed and passed
/// by reference into parse sessions; never a hidden singleton.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: HashMap<LanguageId, CompiledGrammar>,
}

impl GrammarRegistry {
    pub fn new() -> GrammarRegistry {
        GrammarRegistry::default()
    }

    /// Registry preloaded with the seven built-in grammars.
    pub fn with_builtin_grammars() -> Result<GrammarRegistry, GrammarLoadError> {
        let mut registry = GrammarRegistry::new();
        for (name, text) in [
            ("javascript.json", JAVASCRIPT_GRAMMAR),
            ("typescript.json", TYPESCRIPT_GRAMMAR),
            ("go.json", GO_GRAMMAR),
            ("rust.json", RUST_GRAMMAR),
            ("python.json", PYTHON_GRAMMAR),
            ("java.json", JAVA_GRAMMAR),
            ("c.json", C_GRAMMAR),
        ] {
            registry.register_json(name, text)?;
        }
        Ok(registry)
    }

    /// Deserialize and register a grammar from JSON text. Deserialization
    /// failures carry the offending location in the JSON source.
    pub fn register_json(&mut self, name: &str, text: &str) -> Result<(), GrammarLoadError> {
        let dictionary: GrammarDictionary =
            serde_json::from_str(text).map_err(|err| GrammarLoadError::MalformedGrammar {
                language: name.to_string(),
                span: (byte_offset(text, err.line(), err.column()), 0).into(),
                src: NamedSource::new(name.to_string(), text.to_string()),
                message: err.to_string(),
            })?;
        self.register(dictionary)
    }

    /// Validate and index a dictionary. Fails if a lexeme has incompatible
    /// interpretations without connecting rules, if a rule is structurally
    /// invalid, or if a rule references an undeclared lexeme.
    pub fn register(&mut self, mut dictionary: GrammarDictionary) -> Result<(), GrammarLoadError> {
        let language = dictionary.language;
        for (opener, region) in dictionary.comments.iter_mut() {
            if region.pattern.is_empty() {
                region.pattern = opener.clone();
            }
        }
        if self.grammars.contains_key(&language) {
            return Err(GrammarLoadError::DuplicateLanguage {
                language: language.to_string(),
            });
        }

        validate_section_overlap(&dictionary)?;

        let mut rules = HashMap::new();
        let mut typos = HashMap::new();

        for (lexeme, def) in &dictionary.keywords {
            let compiled = compile_rules(&dictionary, lexeme, &def.disambiguation)?;
            if def.contextual && compiled.is_empty() {
                return Err(GrammarLoadError::UnresolvableContextual {
                    language: language.to_string(),
                    lexeme: lexeme.clone(),
                });
            }
            if !compiled.is_empty() {
                rules.insert(lexeme.clone(), compiled);
            }
            for typo in &def.common_typos {
                typos.insert(typo.clone(), lexeme.clone());
            }
        }
        for (lexeme, def) in &dictionary.operators {
            let compiled = compile_rules(&dictionary, lexeme, &def.disambiguation)?;
            if def.contextual && compiled.is_empty() {
                return Err(GrammarLoadError::UnresolvableContextual {
                    language: language.to_string(),
                    lexeme: lexeme.clone(),
                });
            }
            if !compiled.is_empty() {
                rules.insert(lexeme.clone(), compiled);
            }
        }
        for (lexeme, def) in &dictionary.punctuation {
            let compiled = compile_rules(&dictionary, lexeme, &def.disambiguation)?;
            if !compiled.is_empty() {
                rules.insert(lexeme.clone(), compiled);
            }
        }

        let mut symbols: Vec<(String, SymbolSection)> = dictionary
            .operators
            .keys()
            .map(|l| (l.clone(), SymbolSection::Operator))
            .chain(
                dictionary
                    .punctuation
                    .keys()
                    .map(|l| (l.clone(), SymbolSection::Punctuation)),
            )
            .collect();
        symbols.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let mut regions: Vec<String> = dictionary.comments.keys().cloned().collect();
        regions.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        debug!(
            "registered {} grammar: {} keywords, {} operators, {} punctuation, {} literal regions",
            language,
            dictionary.keywords.len(),
            dictionary.operators.len(),
            dictionary.punctuation.len(),
            dictionary.comments.len()
        );

        self.grammars.insert(
            language,
            CompiledGrammar {
                dictionary,
                symbols,
                regions,
                rules,
                typos,
            },
        );
        Ok(())
    }

    pub fn grammar(&self, language: LanguageId) -> Result<&CompiledGrammar, GrammarLoadError> {
        self.grammars
            .get(&language)
            .ok_or_else(|| GrammarLoadError::UnknownLanguage {
                language: language.to_string(),
            })
    }

    pub fn languages(&self) -> Vec<LanguageId> {
        let mut languages: Vec<LanguageId> = self.grammars.keys().copied().collect();
        languages.sort_by_key(|l| l.name());
        languages
    }
}

/// Lexemes living in more than one section must be connected by rules.
fn validate_section_overlap(dictionary: &GrammarDictionary) -> Result<(), GrammarLoadError> {
    let language = dictionary.language.to_string();
    for (lexeme, op) in &dictionary.operators {
        if dictionary.punctuation.contains_key(lexeme)
            && op.disambiguation.is_empty()
            && dictionary.punctuation[lexeme].disambiguation.is_empty()
        {
            return Err(GrammarLoadError::ConflictingLexeme {
                language: language.clone(),
                lexeme: lexeme.clone(),
                first: "operators".to_string(),
                second: "punctuation".to_string(),
            });
        }
    }
    for (lexeme, kw) in &dictionary.keywords {
        if dictionary.operators.contains_key(lexeme) && kw.disambiguation.is_empty() {
            return Err(GrammarLoadError::ConflictingLexeme {
                language: language.clone(),
                lexeme: lexeme.clone(),
                first: "keywords".to_string(),
                second: "operators".to_string(),
            });
        }
    }
    Ok(())
}

fn compile_rules(
    dictionary: &GrammarDictionary,
    lexeme: &str,
    raw: &[DisambiguationRule],
) -> Result<Vec<CompiledRule>, GrammarLoadError> {
    let language = dictionary.language.to_string();
    let invalid = |reason: &str| GrammarLoadError::InvalidRule {
        language: language.clone(),
        lexeme: lexeme.to_string(),
        reason: reason.to_string(),
    };

    let mut compiled = Vec::with_capacity(raw.len());
    let mut saw_default = false;
    for rule in raw {
        if saw_default {
            return Err(invalid("rules after the unconditional default are unreachable"));
        }
        match (&rule.then, &rule.default) {
            (Some(_), Some(_)) => {
                return Err(invalid("a rule declares both `then` and `default`"));
            }
            (None, None) => {
                return Err(invalid("a rule declares neither `then` nor `default`"));
            }
            (Some(then), None) => {
                if !rule.has_conditions() {
                    return Err(invalid("a `then` rule needs at least one condition"));
                }
                let conditions = compile_conditions(dictionary, lexeme, rule, &invalid)?;
                compiled.push(CompiledRule {
                    conditions,
                    outcome: RuleOutcome::Then(then.0),
                });
            }
            (None, Some(default)) => {
                if rule.has_conditions() {
                    return Err(invalid("the `default` rule must be unconditional"));
                }
                saw_default = true;
                compiled.push(CompiledRule {
                    conditions: Vec::new(),
                    outcome: RuleOutcome::Default(default.0),
                });
            }
        }
    }
    Ok(compiled)
}

fn compile_conditions(
    dictionary: &GrammarDictionary,
    lexeme: &str,
    rule: &DisambiguationRule,
    invalid: &dyn Fn(&str) -> GrammarLoadError,
) -> Result<Vec<RuleCondition>, GrammarLoadError> {
    let check_classes = |classes: &[TokenClass]| -> Result<(), GrammarLoadError> {
        for class in classes {
            if let TokenClass::Lexeme(l) = class {
                if !dictionary.declares(l) && !is_word(l) {
                    return Err(invalid(&format!(
                        "condition references undeclared lexeme `{l}`"
                    )));
                }
            }
        }
        Ok(())
    };

    let mut conditions = Vec::new();
    if !rule.if_preceded_by.is_empty() {
        check_classes(&rule.if_preceded_by)?;
        conditions.push(RuleCondition::PrecededBy(rule.if_preceded_by.clone()));
    }
    if !rule.if_followed_by.is_empty() {
        check_classes(&rule.if_followed_by)?;
        conditions.push(RuleCondition::FollowedBy(rule.if_followed_by.clone()));
    }
    if !rule.not_preceded_by.is_empty() {
        check_classes(&rule.not_preceded_by)?;
        conditions.push(RuleCondition::NotPrecededBy(rule.not_preceded_by.clone()));
    }
    if !rule.not_followed_by.is_empty() {
        check_classes(&rule.not_followed_by)?;
        conditions.push(RuleCondition::NotFollowedBy(rule.not_followed_by.clone()));
    }
    if !rule.in_parent_context.is_empty() {
        conditions.push(RuleCondition::InParentContext(rule.in_parent_context.clone()));
    }
    if let Some(language) = rule.language {
        conditions.push(RuleCondition::LanguageIs(language));
    }
    if let Some(probe) = &rule.scout {
        if !dictionary.declares(&probe.open) || !dictionary.declares(&probe.close) {
            return Err(invalid(&format!(
                "scout probe on `{lexeme}` references undeclared delimiters"
            )));
        }
        for stop in &probe.stop_at {
            if !dictionary.declares(stop) {
                return Err(invalid(&format!(
                    "scout probe stop lexeme `{stop}` is undeclared"
                )));
            }
        }
        conditions.push(RuleCondition::BalancedAhead(probe.clone()));
    }
    Ok(conditions)
}

/// Identifier-shaped condition lexemes (e.g. `function`) may reference words
/// that are resolved as identifiers rather than grammar entries.
fn is_word(lexeme: &str) -> bool {
    !lexeme.is_empty() && lexeme.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (index, l) in text.lines().enumerate() {
        if index + 1 == line {
            return offset + column.saturating_sub(1).min(l.len());
        }
        offset += l.len() + 1;
    }
    text.len().saturating_sub(1)
}
