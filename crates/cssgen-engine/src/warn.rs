use std::collections::HashSet;
use std::sync::Mutex;

/// Process-wide, once-per-message warning sink. An unmatched shortcut
/// sub-token is logged once per unique key, never spammed on repeat hits.
///
/// Routed through `tracing::warn!` rather than `eprintln!` because this is a
/// library crate, not a CLI leaf — the host decides where warnings end up by
/// installing a subscriber.
#[derive(Debug, Default)]
pub struct Warner {
    seen: Mutex<HashSet<String>>,
}

impl Warner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `message` through `tracing::warn!` unless an identical message
    /// (keyed by `key`) has already been emitted on this warner.
    pub fn warn_once(&self, key: &str, message: &str) {
        let mut seen = self.seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if seen.insert(key.to_string()) {
            tracing::warn!("{message}");
        }
    }

    /// Whether `key` has already triggered a warning on this warner.
    #[must_use]
    pub fn has_warned(&self, key: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(key)
    }

    pub fn reset(&self) {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}
