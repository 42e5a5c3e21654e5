use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cssgen_common::config::{BlocklistEntry, PreflightData, ResolvedConfigData};
use regex::Regex;

use crate::extractor::Extractor;
use crate::rule::Rule;
use crate::shortcut::Shortcut;
use crate::stringify::PostHook;
use crate::variant::Variant;

pub type PreprocessHook = Arc<dyn Fn(&str) -> String + Send + Sync>;
pub type SortLayersHook = Arc<dyn Fn(Vec<String>) -> Vec<String> + Send + Sync>;

/// A preflight's CSS source: either the literal string loaded from config
/// data, or a handler that computes it asynchronously.
#[async_trait]
pub trait PreflightProvider: Send + Sync {
    async fn css(&self) -> String;
}

pub enum PreflightSource {
    Static(String),
    Dynamic(Arc<dyn PreflightProvider>),
}

pub struct Preflight {
    pub layer: String,
    pub source: PreflightSource,
}

impl Preflight {
    pub async fn css(&self) -> String {
        match &self.source {
            PreflightSource::Static(css) => css.clone(),
            PreflightSource::Dynamic(provider) => provider.css().await,
        }
    }
}

impl From<PreflightData> for Preflight {
    fn from(data: PreflightData) -> Self {
        Self {
            layer: data.layer,
            source: PreflightSource::Static(data.css),
        }
    }
}

/// A resolved blocklist entry.
pub enum BlocklistMatcher {
    Literal(String),
    Pattern(Regex),
}

impl BlocklistMatcher {
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        match self {
            Self::Literal(s) => s == raw,
            Self::Pattern(re) => re.is_match(raw),
        }
    }
}

/// Failure resolving a [`UserConfig`] into a [`ResolvedConfig`]: currently
/// only an invalid blocklist regex pattern can fail at this stage.
#[derive(Debug)]
pub struct ResolveError {
    pattern: String,
    source: regex::Error,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid blocklist pattern {:?}", self.pattern)
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// The immutable, resolved configuration a [`crate::Generator`] holds for
/// the lifetime of one config generation.
pub struct ResolvedConfig {
    pub rules: Vec<Rule>,
    pub rules_static_map: HashMap<String, usize>,
    pub shortcuts: Vec<Shortcut>,
    pub variants: Vec<Arc<dyn Variant>>,
    pub extractors: Vec<Arc<dyn Extractor>>,
    pub preprocess: Vec<PreprocessHook>,
    pub postprocess: Vec<PostHook>,
    pub preflights: Vec<Preflight>,
    pub blocklist: Vec<BlocklistMatcher>,
    pub safelist: Vec<String>,
    pub theme: Arc<dyn Any + Send + Sync>,
    pub layers: HashMap<String, i32>,
    pub sort_layers: Option<SortLayersHook>,
    pub shortcuts_layer: String,
    pub merge_selectors: bool,
}

/// Builder for a [`ResolvedConfig`]: accumulates the handler-bearing
/// ("code") registrations alongside the serializable ("data") half loaded
/// from a TOML/JSON file, the same split the data/code config halves draw
/// in `cssgen-common::config`.
#[derive(Default)]
pub struct UserConfig {
    data: ResolvedConfigData,
    rules: Vec<Rule>,
    shortcuts: Vec<Shortcut>,
    variants: Vec<Arc<dyn Variant>>,
    extractors: Vec<Arc<dyn Extractor>>,
    preprocess: Vec<PreprocessHook>,
    postprocess: Vec<PostHook>,
    dynamic_preflights: Vec<(String, Arc<dyn PreflightProvider>)>,
    theme: Option<Arc<dyn Any + Send + Sync>>,
    sort_layers: Option<SortLayersHook>,
}

impl UserConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data(mut self, data: ResolvedConfigData) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn with_shortcut(mut self, shortcut: Shortcut) -> Self {
        self.shortcuts.push(shortcut);
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: Arc<dyn Variant>) -> Self {
        self.variants.push(variant);
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    #[must_use]
    pub fn with_preprocess(mut self, hook: PreprocessHook) -> Self {
        self.preprocess.push(hook);
        self
    }

    #[must_use]
    pub fn with_postprocess(mut self, hook: PostHook) -> Self {
        self.postprocess.push(hook);
        self
    }

    #[must_use]
    pub fn with_dynamic_preflight(mut self, layer: impl Into<String>, provider: Arc<dyn PreflightProvider>) -> Self {
        self.dynamic_preflights.push((layer.into(), provider));
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Arc<dyn Any + Send + Sync>) -> Self {
        self.theme = Some(theme);
        self
    }

    #[must_use]
    pub fn with_sort_layers(mut self, hook: SortLayersHook) -> Self {
        self.sort_layers = Some(hook);
        self
    }

    /// Resolve into an immutable [`ResolvedConfig`]. Static rules/shortcuts
    /// from the data half are appended after any programmatically-registered
    /// entries, so code-registered dynamic rules occupy the lower indices
    /// and config-data statics the higher ones; since statics are looked up
    /// by key in `rules_static_map` (last-registered wins on collision) this
    /// ordering choice only affects dynamic-scan priority among rules that
    /// also happen to be dynamic, which data-loaded rules never are.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if a blocklist pattern entry is not a valid
    /// regular expression.
    pub fn resolve(self) -> Result<ResolvedConfig, ResolveError> {
        let mut rules = self.rules;
        for rule_data in self.data.static_rules {
            rules.push(Rule::Static(crate::rule::StaticRule {
                key: rule_data.selector,
                declarations: rule_data.declarations.into(),
                meta: rule_data.meta,
            }));
        }

        let mut rules_static_map = HashMap::new();
        for (idx, rule) in rules.iter().enumerate() {
            if let Rule::Static(r) = rule {
                rules_static_map.insert(r.key.clone(), idx);
            }
        }

        let mut shortcuts = self.shortcuts;
        for shortcut_data in self.data.static_shortcuts {
            shortcuts.push(Shortcut::Static(crate::shortcut::StaticShortcut {
                key: shortcut_data.key,
                expansion: shortcut_data.expansion.into(),
                meta: shortcut_data.meta,
            }));
        }

        let mut blocklist = Vec::with_capacity(self.data.blocklist.len());
        for entry in self.data.blocklist {
            blocklist.push(match entry {
                BlocklistEntry::Literal(s) => BlocklistMatcher::Literal(s),
                BlocklistEntry::Pattern { pattern } => {
                    let re = Regex::new(&pattern).map_err(|source| ResolveError {
                        pattern: pattern.clone(),
                        source,
                    })?;
                    BlocklistMatcher::Pattern(re)
                }
            });
        }

        let mut preflights: Vec<Preflight> =
            self.data.preflights.into_iter().map(Preflight::from).collect();
        for (layer, provider) in self.dynamic_preflights {
            preflights.push(Preflight {
                layer,
                source: PreflightSource::Dynamic(provider),
            });
        }

        Ok(ResolvedConfig {
            rules,
            rules_static_map,
            shortcuts,
            variants: self.variants,
            extractors: self.extractors,
            preprocess: self.preprocess,
            postprocess: self.postprocess,
            preflights,
            blocklist,
            safelist: self.data.safelist,
            theme: self.theme.unwrap_or_else(|| Arc::new(())),
            layers: self.data.layers.into_iter().collect(),
            sort_layers: self.sort_layers,
            shortcuts_layer: self.data.shortcuts_layer,
            merge_selectors: self.data.merge_selectors,
        })
    }
}

impl ResolvedConfig {
    /// True if `raw` is empty or matches any blocklist entry.
    #[must_use]
    pub fn is_blocked(&self, raw: &str) -> bool {
        raw.is_empty() || self.blocklist.iter().any(|m| m.matches(raw))
    }
}
