use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reserved declaration property that forces an entry to bypass merging
/// during shortcut stringification. Chosen with a double-dash prefix plus
/// an engine-specific suffix so it can never collide with a real CSS
/// custom property a user writes by hand.
pub const NO_MERGE_MARKER: &str = "--cssgen-no-merge-0x";

/// An ordered list of `(property, value)` declaration pairs.
///
/// This is the normalized form every downstream stage of the engine sees.
/// Ingress accepts either an already-ordered list or a mapping; both
/// coerce to this type, preserving the order the entries were given in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declarations(pub Vec<(String, String)>);

impl Declarations {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.0.push((property.into(), value.into()));
    }

    /// True if any entry carries the no-merge control marker.
    #[must_use]
    pub fn has_no_merge_marker(&self) -> bool {
        self.0.iter().any(|(k, _)| k == NO_MERGE_MARKER)
    }

    /// Entries with the control marker filtered out, in original order.
    #[must_use]
    pub fn without_marker(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| k != NO_MERGE_MARKER)
                .cloned()
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, String)> {
        self.0.iter()
    }
}

impl IntoIterator for Declarations {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, String)> for Declarations {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<(String, String)>> for Declarations {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

/// Declarations as they arrive from a rule handler or a config file: either
/// an ordered list of pairs, or a mapping. `RawDeclarations` exists only at
/// ingress; everything past normalization uses [`Declarations`].
///
/// The mapping form uses [`IndexMap`] rather than a `BTreeMap` so that
/// deserializing `{ "margin-top": .., "margin-bottom": .. }` preserves the
/// order the keys were written in, instead of re-sorting them
/// alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDeclarations {
    Ordered(Vec<(String, String)>),
    Mapping(IndexMap<String, String>),
}

impl From<RawDeclarations> for Declarations {
    fn from(raw: RawDeclarations) -> Self {
        match raw {
            RawDeclarations::Ordered(pairs) => Self(pairs),
            RawDeclarations::Mapping(map) => Self(map.into_iter().collect()),
        }
    }
}
