use serde::{Deserialize, Serialize};

use crate::grammar::FeatureRule;

/// Parse-session configuration. Every field has a default so partial JSON
/// configs deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserConfig {
    /// Soft cap on tracked structural nesting.
    pub max_depth: usize,
    /// Hard cap on tokens produced.
    pub max_tokens: usize,
    /// Escalate every Prophet-derived resolution to an issue.
    pub strict_mode: bool,
    /// Passed through to the downstream rule collaborator; not consumed here.
    pub allow_implicit_globals: bool,
    /// Strict entry points return an error after completion when issues exist.
    pub throw_on_error: bool,
    /// When false, issues are counted and reported but not accumulated.
    pub collect_errors: bool,
    /// Cap on accumulated issues; a single truncation marker is appended.
    pub max_errors: usize,
    pub enable_caching: bool,
    pub cache_size: usize,
    /// Compact in-memory token representation. No externally observable
    /// semantic difference; recorded for callers that introspect it.
    pub binary_mode: bool,
    pub rules: LanguageRules,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_depth: 100,
            max_tokens: 100_000,
            strict_mode: false,
            allow_implicit_globals: false,
            throw_on_error: false,
            collect_errors: true,
            max_errors: 100,
            enable_caching: true,
            cache_size: 1000,
            binary_mode: true,
            rules: LanguageRules::default(),
        }
    }
}

/// Language-feature allow-list consulted by the disambiguator when a
/// contextual keyword's validity depends on version gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageRules {
    pub allow_async: bool,
    pub allow_await: bool,
    pub allow_generators: bool,
    pub allow_classes: bool,
    pub allow_modules: bool,
}

impl Default for LanguageRules {
    fn default() -> Self {
        LanguageRules {
            allow_async: true,
            allow_await: true,
            allow_generators: true,
            allow_classes: true,
            allow_modules: true,
        }
    }
}

impl LanguageRules {
    pub fn allows(&self, rule: FeatureRule) -> bool {
        match rule {
            FeatureRule::AllowAsync => self.allow_async,
            FeatureRule::AllowAwait => self.allow_await,
            FeatureRule::AllowGenerators => self.allow_generators,
            FeatureRule::AllowClasses => self.allow_classes,
            FeatureRule::AllowModules => self.allow_modules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_config() {
        let config = ParserConfig::default();
        assert_eq!(config.max_depth, 100);
        assert_eq!(config.max_tokens, 100_000);
        assert_eq!(config.max_errors, 100);
        assert_eq!(config.cache_size, 1000);
        assert!(config.collect_errors);
        assert!(config.enable_caching);
        assert!(!config.strict_mode);
        assert!(config.rules.allow_async);
    }

    #[test]
    fn test_partial_json_config() {
        let config: ParserConfig =
            serde_json::from_str(r#"{"maxDepth": 5, "rules": {"allowAsync": false}}"#).unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.max_tokens, 100_000);
        assert!(!config.rules.allow_async);
        assert!(config.rules.allow_await);
    }
}
