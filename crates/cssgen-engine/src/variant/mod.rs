use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use cssgen_common::Declarations;

use crate::context::RuleContext;
use crate::error::{EngineError, EngineResult};

/// An at-rule wrapper a variant contributes, optionally with an ordering
/// weight registered in `parentOrders`.
#[derive(Clone)]
pub enum ParentSpec {
    Plain(String),
    Ordered(String, i32),
}

impl ParentSpec {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(n) | Self::Ordered(n, _) => n,
        }
    }
}

type BodyFn = dyn Fn(Declarations) -> Declarations + Send + Sync;
type SelectorFn = dyn Fn(&str, &Declarations) -> String + Send + Sync;

/// A handler record produced by a matching [`Variant`].
#[derive(Default)]
pub struct VariantHandlerResult {
    pub matcher: String,
    pub body: Option<Arc<BodyFn>>,
    pub selector: Option<Arc<SelectorFn>>,
    pub parent: Option<ParentSpec>,
    pub layer: Option<String>,
    pub order: Option<i32>,
}

impl VariantHandlerResult {
    #[must_use]
    pub fn matcher_only(matcher: impl Into<String>) -> Self {
        Self {
            matcher: matcher.into(),
            ..Self::default()
        }
    }
}

/// What a [`Variant::try_match`] call returns on a hit: either a bare
/// replacement string, treated as `{matcher: string}`, or a full handler
/// record.
pub enum VariantMatch {
    Matcher(String),
    Handler(VariantHandlerResult),
}

impl VariantMatch {
    fn into_handler(self) -> VariantHandlerResult {
        match self {
            Self::Matcher(m) => VariantHandlerResult::matcher_only(m),
            Self::Handler(h) => h,
        }
    }
}

/// A polymorphic variant matcher.
#[async_trait]
pub trait Variant: Send + Sync {
    async fn try_match(&self, current: &str, ctx: &RuleContext<'_>) -> Option<VariantMatch>;

    /// Whether this variant may re-apply on later passes of the same token.
    fn multi_pass(&self) -> bool {
        false
    }

    /// Default application order used when a hit doesn't specify its own.
    fn order(&self) -> i32 {
        0
    }
}

/// A variant handler that matched, with its effective order resolved and
/// its originating variant slot recorded (used only for diagnostics).
#[derive(Clone)]
pub struct AppliedVariantHandler {
    pub body: Option<Arc<BodyFn>>,
    pub selector: Option<Arc<SelectorFn>>,
    pub parent: Option<ParentSpec>,
    pub layer: Option<String>,
    pub order: i32,
}

pub struct VariantMatchResult {
    pub raw: String,
    pub residual: String,
    pub handlers: Vec<AppliedVariantHandler>,
}

/// Maximum variant handlers a single token may accumulate.
pub const MAX_VARIANT_HANDLERS: usize = 500;

/// Peel variant prefixes/suffixes from a raw token.
///
/// Scans `variants` in configured order on every pass, applying the first
/// hit and restarting from the top; terminates when a full scan produces no
/// hit. Fails with [`EngineError::VariantOverflow`] past
/// [`MAX_VARIANT_HANDLERS`] applications.
pub async fn match_variants(
    variants: &[Arc<dyn Variant>],
    raw: &str,
    preprocessed: Option<&str>,
    ctx: &RuleContext<'_>,
) -> EngineResult<VariantMatchResult> {
    let mut processed = preprocessed.unwrap_or(raw).to_string();
    let mut used: HashSet<usize> = HashSet::new();
    let mut handlers = Vec::new();

    'scan: loop {
        for (i, variant) in variants.iter().enumerate() {
            if used.contains(&i) && !variant.multi_pass() {
                continue;
            }
            let Some(hit) = variant.try_match(&processed, ctx).await else {
                continue;
            };
            let handler = hit.into_handler();
            processed.clone_from(&handler.matcher);
            if let Some(ParentSpec::Ordered(name, order)) = &handler.parent {
                ctx.record_parent_order(name, *order);
            }
            let order = handler.order.unwrap_or_else(|| variant.order());
            handlers.push(AppliedVariantHandler {
                body: handler.body,
                selector: handler.selector,
                parent: handler.parent,
                layer: handler.layer,
                order,
            });
            used.insert(i);
            if handlers.len() > MAX_VARIANT_HANDLERS {
                return Err(EngineError::VariantOverflow {
                    raw: raw.to_string(),
                    limit: MAX_VARIANT_HANDLERS,
                });
            }
            continue 'scan;
        }
        break;
    }

    Ok(VariantMatchResult {
        raw: raw.to_string(),
        residual: processed,
        handlers,
    })
}
