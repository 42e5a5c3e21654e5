use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::cache::{CachedEntry, TokenCache};
use crate::config::ResolvedConfig;
use crate::context::{ParentOrders, RuleContext};
use crate::error::EngineResult;
use crate::extractor;
use crate::rule;
use crate::sheet::{self, Sheet};
use crate::shortcut;
use crate::stringify;
use crate::variant;
use crate::warn::Warner;

/// Options accepted by [`Generator::generate`].
pub struct GenerateOptions {
    pub id: Option<String>,
    pub scope: Option<String>,
    pub preflights: bool,
    pub safelist: bool,
    pub minify: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            id: None,
            scope: None,
            preflights: true,
            safelist: true,
            minify: false,
        }
    }
}

/// The output of one `generate` call: the full stylesheet, the ordered
/// layer list, a per-layer getter, and the matched-token set.
pub struct GenerateResult {
    pub css: String,
    pub layers: Vec<String>,
    pub matched: HashSet<String>,
    layer_css: HashMap<String, String>,
}

impl GenerateResult {
    #[must_use]
    pub fn get_layer(&self, name: &str) -> Option<&str> {
        self.layer_css.get(name).map(String::as_str)
    }

    /// Concatenate the CSS for `self.layers`, optionally restricted to
    /// `includes` and/or filtered by `excludes`, in layer order.
    #[must_use]
    pub fn get_layers(&self, includes: Option<&[String]>, excludes: Option<&[String]>) -> String {
        self.layers
            .iter()
            .filter(|l| includes.is_none_or(|inc| inc.contains(l)))
            .filter(|l| !excludes.is_some_and(|exc| exc.contains(l)))
            .filter_map(|l| self.layer_css.get(l))
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The engine entry point. Owns the token cache, the blocked-token set,
/// and `parentOrders` for the lifetime of one resolved config;
/// [`Generator::set_config`] replaces the config and resets all three.
pub struct Generator {
    config: RwLock<Arc<ResolvedConfig>>,
    cache: TokenCache,
    warner: Warner,
    parent_orders: ParentOrders,
}

impl Generator {
    #[must_use]
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            cache: TokenCache::new(),
            warner: Warner::new(),
            parent_orders: ParentOrders::default(),
        }
    }

    /// Replace the resolved config, resetting the cache, blocked set, and
    /// `parentOrders`.
    pub fn set_config(&self, config: ResolvedConfig) {
        *self
            .config
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Arc::new(config);
        self.cache.reset();
        self.warner.reset();
        *self
            .parent_orders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = HashMap::new();
    }

    fn config_snapshot(&self) -> Arc<ResolvedConfig> {
        Arc::clone(
            &self
                .config
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    /// Run every configured extractor over `code` and union the resulting
    /// raw tokens into `acc`.
    pub async fn apply_extractors(&self, code: &str, id: Option<&str>, acc: &mut HashSet<String>) {
        let config = self.config_snapshot();
        extractor::apply_extractors(&config.extractors, code, id, acc).await;
    }

    /// Resolve a single raw token to its cached stringified result,
    /// computing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::EngineError::VariantOverflow`] if `raw`
    /// accumulates more than [`variant::MAX_VARIANT_HANDLERS`] variant
    /// applications.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn parse_token(&self, raw: &str) -> EngineResult<CachedEntry> {
        if let Some(entry) = self.cache.get(raw) {
            return Ok(entry);
        }
        if self.cache.is_blocked(raw) {
            return Ok(self.cache_unmatched(raw));
        }

        let config = self.config_snapshot();
        if config.is_blocked(raw) {
            self.cache.mark_blocked(raw);
            return Ok(self.cache_unmatched(raw));
        }

        // Preprocess chain is a pipeline fold: each hook sees the previous
        // hook's output, not the original raw token.
        let mut current = raw.to_string();
        for hook in &config.preprocess {
            current = hook(&current);
        }

        if config.is_blocked(&current) {
            self.cache.mark_blocked(raw);
            return Ok(self.cache_unmatched(raw));
        }

        let pre_variant_ctx = RuleContext {
            raw_selector: raw,
            current_selector: &current,
            theme: config.theme.as_ref(),
            variant_handlers: &[],
            parent_orders: Arc::clone(&self.parent_orders),
        };
        let variant_result =
            variant::match_variants(&config.variants, raw, Some(&current), &pre_variant_ctx)
                .await?;

        if variant_result.handlers.is_empty() && config.is_blocked(&variant_result.residual) {
            self.cache.mark_blocked(raw);
            return Ok(self.cache_unmatched(raw));
        }

        let ctx = RuleContext {
            raw_selector: raw,
            current_selector: &variant_result.residual,
            theme: config.theme.as_ref(),
            variant_handlers: &variant_result.handlers,
            parent_orders: Arc::clone(&self.parent_orders),
        };

        let utilities = match shortcut::expand(&config.shortcuts, &variant_result.residual, &ctx)
            .await
        {
            Some(expansion) => {
                stringify::stringify_shortcut(
                    &config.rules,
                    &config.rules_static_map,
                    &config.variants,
                    raw,
                    &variant_result.handlers,
                    expansion.tokens,
                    &expansion.meta,
                    &config.shortcuts_layer,
                    &config.postprocess,
                    &ctx,
                    &self.warner,
                    raw,
                )
                .await
            }
            None => {
                let outcomes = rule::match_rule(
                    &config.rules,
                    &config.rules_static_map,
                    raw,
                    &variant_result.residual,
                    &variant_result.handlers,
                    &ctx,
                    false,
                )
                .await;
                match outcomes {
                    None => Vec::new(),
                    Some(outcomes) => outcomes
                        .into_iter()
                        .filter_map(|o| stringify::stringify_outcome(o, &config.postprocess))
                        .collect(),
                }
            }
        };

        let entry = if utilities.is_empty() {
            CachedEntry::Unmatched
        } else {
            CachedEntry::Matched(utilities)
        };
        self.cache.insert(raw, entry.clone());
        Ok(entry)
    }

    fn cache_unmatched(&self, raw: &str) -> CachedEntry {
        let entry = CachedEntry::Unmatched;
        self.cache.insert(raw, entry.clone());
        entry
    }

    /// Extract tokens from `input`, optionally merge in the safelist, and
    /// generate a stylesheet.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::error::EngineError`] from any per-token
    /// variant/rule/shortcut failure.
    #[tracing::instrument(level = "debug", skip(self, input))]
    pub async fn generate(
        &self,
        input: &str,
        opts: &GenerateOptions,
    ) -> EngineResult<GenerateResult> {
        let mut tokens = HashSet::new();
        self.apply_extractors(input, opts.id.as_deref(), &mut tokens)
            .await;
        if opts.safelist {
            let config = self.config_snapshot();
            tokens.extend(config.safelist.iter().cloned());
        }
        self.generate_from_tokens(tokens, opts).await
    }

    /// Generate a stylesheet directly from a pre-extracted token set,
    /// bypassing the extractor pipeline (useful for merging several
    /// extraction passes into one token set before generating).
    ///
    /// # Errors
    ///
    /// Propagates [`crate::error::EngineError`] from any per-token
    /// variant/rule/shortcut failure.
    pub async fn generate_from_tokens(
        &self,
        tokens: HashSet<String>,
        opts: &GenerateOptions,
    ) -> EngineResult<GenerateResult> {
        let mut matched = HashSet::new();
        let mut utilities = Vec::new();
        for token in &tokens {
            match self.parse_token(token).await? {
                CachedEntry::Matched(list) => {
                    matched.insert(token.clone());
                    utilities.extend(list);
                }
                CachedEntry::Unmatched => {}
            }
        }

        let config = self.config_snapshot();
        let parent_orders = self
            .parent_orders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let sheet: Sheet = sheet::build_sheet(utilities);

        let mut layer_names: Vec<String> = sheet::layer_names(&sheet).into_iter().collect();
        if opts.preflights {
            for preflight in &config.preflights {
                if !layer_names.contains(&preflight.layer) {
                    layer_names.push(preflight.layer.clone());
                }
            }
        }
        let ordered_layers =
            sheet::sorted_layer_names(layer_names, &config.layers, config.sort_layers.as_ref());

        let mut layer_css = HashMap::new();
        for layer in &ordered_layers {
            let mut body = sheet::assemble_layer(
                &sheet,
                &parent_orders,
                layer,
                opts.scope.as_deref(),
                config.merge_selectors,
            );

            if opts.preflights {
                let mut preflight_css = String::new();
                for preflight in &config.preflights {
                    if preflight.layer != *layer {
                        continue;
                    }
                    let css = preflight.css().await;
                    if css.is_empty() {
                        continue;
                    }
                    if !preflight_css.is_empty() {
                        preflight_css.push('\n');
                    }
                    preflight_css.push_str(&css);
                }
                if !preflight_css.is_empty() {
                    body = if body.is_empty() {
                        preflight_css
                    } else {
                        format!("{preflight_css}\n{body}")
                    };
                }
            }

            if body.is_empty() {
                continue;
            }
            if !opts.minify {
                body = format!("/* layer: {layer} */\n{body}");
            }
            layer_css.insert(layer.clone(), body);
        }

        let joiner = if opts.minify { "" } else { "\n" };
        let css = ordered_layers
            .iter()
            .filter_map(|l| layer_css.get(l))
            .cloned()
            .collect::<Vec<_>>()
            .join(joiner);

        Ok(GenerateResult {
            css,
            layers: ordered_layers,
            matched,
            layer_css,
        })
    }
}
