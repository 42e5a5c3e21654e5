use sha2::{Digest, Sha256};

use crate::config::ResolvedConfigData;

/// Error returned when a [`ResolvedConfigData`] cannot be hashed.
///
/// Wraps the underlying serialization error without exposing `serde_json`
/// as a public dependency of this crate.
#[derive(Debug)]
pub struct HashError(serde_json::Error);

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for HashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_json::Error> for HashError {
    fn from(e: serde_json::Error) -> Self {
        Self(e)
    }
}

/// Compute a deterministic SHA-256 content hash for the data half of a
/// resolved config. Two configs that are logically identical (same fields,
/// same values) produce the same hash regardless of TOML whitespace or
/// mapping key ordering, because the hash is derived from canonical JSON
/// serialization.
///
/// Used by long-lived-service hosts to decide whether a previously-built
/// cache can be reused across a config reload.
///
/// # Errors
///
/// Returns a [`HashError`] if `config` cannot be serialized to JSON (should
/// not happen for well-formed `ResolvedConfigData` values, but callers must
/// handle it).
pub fn canonical_hash(config: &ResolvedConfigData) -> Result<String, HashError> {
    let json = serde_json::to_vec(config)?;
    let digest = Sha256::digest(&json);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> ResolvedConfigData {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn output_is_64_lowercase_hex_chars() {
        let cfg = parse(r#"merge_selectors = true"#);
        let hash = canonical_hash(&cfg).unwrap();
        assert_eq!(hash.len(), 64, "hash must be 64 chars");
        assert!(
            hash.chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()),
            "hash must be lowercase hex: {hash}"
        );
    }

    #[test]
    fn whitespace_invariance() {
        let a = parse(r#"merge_selectors = true"#);
        let b = parse("merge_selectors    =    true\n\n");
        assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }

    #[test]
    fn different_configs_produce_different_hashes() {
        let a = parse(r#"merge_selectors = true"#);
        let b = parse(r#"merge_selectors = false"#);
        assert_ne!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }

    #[test]
    fn hash_is_stable_across_calls() {
        let cfg = parse(r#"shortcuts_layer = "custom""#);
        let h1 = canonical_hash(&cfg).unwrap();
        let h2 = canonical_hash(&cfg).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn explicit_defaults_same_as_implicit() {
        let implicit = parse("");
        let explicit = parse(
            r#"
static_rules = []
static_shortcuts = []
preflights = []
blocklist = []
safelist = []
shortcuts_layer = "shortcuts"
merge_selectors = false

[layers]
"#,
        );
        assert_eq!(
            canonical_hash(&implicit).unwrap(),
            canonical_hash(&explicit).unwrap(),
            "explicit defaults must hash identically to implicit defaults"
        );
    }
}
