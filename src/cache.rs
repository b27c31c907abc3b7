//! LRU result cache with in-flight deduplication.
//!
//! Concurrent callers asking for the same fingerprint share one computation:
//! the first inserts an in-flight marker and parses, later callers block on
//! the condvar until the slot is ready. A failed computation clears the
//! marker and wakes the waiters so one of them can retry.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Condvar, Mutex};

use log::debug;

use crate::api::ParseResult;
use crate::config::ParserConfig;
use crate::error::VigilError;
use crate::grammar::LanguageId;

/// Cache key over everything that can change a parse result.
pub fn fingerprint(language: LanguageId, source: &str, config: &ParserConfig) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    language.hash(&mut hasher);
    source.hash(&mut hasher);
    config.max_depth.hash(&mut hasher);
    config.max_tokens.hash(&mut hasher);
    config.strict_mode.hash(&mut hasher);
    config.collect_errors.hash(&mut hasher);
    config.max_errors.hash(&mut hasher);
    config.rules.allow_async.hash(&mut hasher);
    config.rules.allow_await.hash(&mut hasher);
    config.rules.allow_generators.hash(&mut hasher);
    config.rules.allow_classes.hash(&mut hasher);
    config.rules.allow_modules.hash(&mut hasher);
    hasher.finish()
}

enum Slot {
    InFlight,
    Ready(Arc<ParseResult>, u64),
}

struct Inner {
    map: HashMap<u64, Slot>,
    tick: u64,
}

pub struct ParseCache {
    inner: Mutex<Inner>,
    ready: Condvar,
    capacity: usize,
}

impl ParseCache {
    pub fn new(capacity: usize) -> ParseCache {
        ParseCache {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                tick: 0,
            }),
            ready: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(inner) => inner.map.len(),
            Err(poisoned) => poisoned.into_inner().map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached result for `key`, or run `compute` exactly once per
    /// concurrent group of callers.
    pub fn get_or_compute<F>(&self, key: u64, compute: F) -> Result<Arc<ParseResult>, VigilError>
    where
        F: FnOnce() -> Result<ParseResult, VigilError>,
    {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            enum Peek {
                Ready(Arc<ParseResult>),
                InFlight,
                Missing,
            }
            let peek = match guard.map.get(&key) {
                Some(Slot::Ready(result, _)) => Peek::Ready(Arc::clone(result)),
                Some(Slot::InFlight) => Peek::InFlight,
                None => Peek::Missing,
            };
            match peek {
                Peek::Ready(result) => {
                    guard.tick += 1;
                    let tick = guard.tick;
                    if let Some(Slot::Ready(_, last_used)) = guard.map.get_mut(&key) {
                        *last_used = tick;
                    }
                    return Ok(result);
                }
                Peek::InFlight => {
                    // The slot will be ready or gone (failure) on wakeup.
                    guard = match self.ready.wait(guard) {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                }
                Peek::Missing => break,
            }
        }

        guard.map.insert(key, Slot::InFlight);
        drop(guard);
        let outcome = compute();
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                guard.tick += 1;
                let tick = guard.tick;
                guard.map.insert(key, Slot::Ready(Arc::clone(&result), tick));
                self.evict(&mut guard);
                self.ready.notify_all();
                Ok(result)
            }
            Err(err) => {
                guard.map.remove(&key);
                self.ready.notify_all();
                Err(err)
            }
        }
    }

    /// Drop least-recently-used ready slots until within capacity. In-flight
    /// markers are never evicted.
    fn evict(&self, inner: &mut Inner) {
        while inner.map.len() > self.capacity {
            let victim = inner
                .map
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready(_, last_used) => Some((*key, *last_used)),
                    Slot::InFlight => None,
                })
                .min_by_key(|(_, last_used)| *last_used)
                .map(|(key, _)| key);
            match victim {
                Some(key) => {
                    debug!("evicting cached parse {key:#x}");
                    inner.map.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::registry::GrammarRegistry;

    fn result_for(source: &str) -> ParseResult {
        let registry = GrammarRegistry::with_builtin_grammars().unwrap();
        api::parse(&registry, LanguageId::Go, source, &ParserConfig::default()).unwrap()
    }

    #[test]
    fn test_hit_returns_same_arc() {
        let cache = ParseCache::new(4);
        let key = fingerprint(LanguageId::Go, "x := 1", &ParserConfig::default());
        let first = cache.get_or_compute(key, || Ok(result_for("x := 1"))).unwrap();
        let second = cache
            .get_or_compute(key, || panic!("must not recompute"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ParseCache::new(2);
        let config = ParserConfig::default();
        let keys: Vec<u64> = ["a", "b", "c"]
            .iter()
            .map(|s| fingerprint(LanguageId::Go, s, &config))
            .collect();
        for (key, source) in keys.iter().zip(["a", "b", "c"]) {
            cache.get_or_compute(*key, || Ok(result_for(source))).unwrap();
        }
        assert_eq!(cache.len(), 2);
        // "a" was least recently used and must recompute.
        let mut recomputed = false;
        cache
            .get_or_compute(keys[0], || {
                recomputed = true;
                Ok(result_for("a"))
            })
            .unwrap();
        assert!(recomputed);
    }

    #[test]
    fn test_fingerprint_varies_with_config() {
        let default = ParserConfig::default();
        let mut strict = ParserConfig::default();
        strict.strict_mode = true;
        assert_ne!(
            fingerprint(LanguageId::Go, "x", &default),
            fingerprint(LanguageId::Go, "x", &strict)
        );
        assert_ne!(
            fingerprint(LanguageId::Go, "x", &default),
            fingerprint(LanguageId::Rust, "x", &default)
        );
    }
}
