use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::declaration::RawDeclarations;

/// One entry in the blocklist — either a literal token or a regex pattern.
///
/// ```toml
/// blocklist = ["debug-only", { pattern = "^unsafe-.*$" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlocklistEntry {
    Literal(String),
    Pattern { pattern: String },
}

/// Meta carried by a rule or shortcut: layer override, internal-only
/// visibility, and the no-merge flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    pub layer: Option<String>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub no_merge: bool,
}

/// The data half of a static rule: everything about it that is just values,
/// not code. The handler-bearing dynamic rules and the static rules'
/// registration order live in `cssgen_engine::config::UserConfig` since
/// they are not serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRuleData {
    pub selector: String,
    pub declarations: RawDeclarations,
    #[serde(default)]
    pub meta: RuleMeta,
}

/// A static shortcut's expansion: a single token string or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShortcutExpansion {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticShortcutData {
    pub key: String,
    pub expansion: ShortcutExpansion,
    #[serde(default)]
    pub meta: RuleMeta,
}

/// A layer-associated block of static CSS emitted before generated rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightData {
    pub layer: String,
    pub css: String,
}

fn default_shortcuts_layer() -> String {
    "shortcuts".to_string()
}

/// The serializable portion of a resolved config — everything that is
/// data rather than code. Loaded from a TOML (or JSON) file and merged
/// into a `cssgen_engine::config::UserConfig` alongside any
/// programmatically-registered dynamic rules/variants/shortcuts/extractors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfigData {
    #[serde(default)]
    pub static_rules: Vec<StaticRuleData>,
    #[serde(default)]
    pub static_shortcuts: Vec<StaticShortcutData>,
    #[serde(default)]
    pub preflights: Vec<PreflightData>,
    #[serde(default)]
    pub blocklist: Vec<BlocklistEntry>,
    #[serde(default)]
    pub safelist: Vec<String>,
    #[serde(default)]
    pub layers: BTreeMap<String, i32>,
    #[serde(default = "default_shortcuts_layer")]
    pub shortcuts_layer: String,
    #[serde(default)]
    pub merge_selectors: bool,
}

impl Default for ResolvedConfigData {
    fn default() -> Self {
        Self {
            static_rules: Vec::new(),
            static_shortcuts: Vec::new(),
            preflights: Vec::new(),
            blocklist: Vec::new(),
            safelist: Vec::new(),
            layers: BTreeMap::new(),
            shortcuts_layer: default_shortcuts_layer(),
            merge_selectors: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> ResolvedConfigData {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = parse("");
        assert!(!cfg.merge_selectors);
        assert_eq!(cfg.shortcuts_layer, "shortcuts");
        assert!(cfg.static_rules.is_empty());
    }

    #[test]
    fn blocklist_accepts_literal_and_pattern() {
        let cfg = parse(
            r#"
blocklist = ["debug-only", { pattern = "^unsafe-.*$" }]
"#,
        );
        assert_eq!(cfg.blocklist.len(), 2);
        assert!(matches!(cfg.blocklist[0], BlocklistEntry::Literal(_)));
        assert!(matches!(cfg.blocklist[1], BlocklistEntry::Pattern { .. }));
    }

    #[test]
    fn static_rule_round_trips() {
        let cfg = parse(
            r#"
[[static_rules]]
selector = "m-2"
declarations = [["margin", "0.5rem"]]
"#,
        );
        assert_eq!(cfg.static_rules[0].selector, "m-2");
    }
}
