use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::stringify::StringifiedUtility;

/// A raw token's memoized outcome: either a non-empty list of stringified
/// utilities, or the "unmatched" sentinel.
#[derive(Clone)]
pub enum CachedEntry {
    Matched(Vec<StringifiedUtility>),
    Unmatched,
}

/// Per-raw-token memoization plus the blocklist-miss set. Owned by the
/// generator for the lifetime of one resolved config; `reset` is called
/// whenever the config is replaced.
#[derive(Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, CachedEntry>>,
    blocked: Mutex<HashSet<String>>,
}

impl TokenCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, raw: &str) -> Option<CachedEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(raw)
            .cloned()
    }

    pub fn insert(&self, raw: impl Into<String>, entry: CachedEntry) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(raw.into(), entry);
    }

    #[must_use]
    pub fn is_blocked(&self, raw: &str) -> bool {
        self.blocked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(raw)
    }

    pub fn mark_blocked(&self, raw: impl Into<String>) {
        self.blocked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(raw.into());
    }

    /// Reset the cache and the blocklist-miss set, e.g. on config
    /// replacement.
    pub fn reset(&self) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        self.blocked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}
