use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cssgen_common::Declarations;

use crate::stringify;
use crate::variant::AppliedVariantHandler;

/// Shared, per-generate-call registry of `@media`/`@supports` ordering
/// weights a variant contributed via a `(name, order)` parent. Additive:
/// the last write for a given name wins.
pub type ParentOrders = Arc<Mutex<HashMap<String, i32>>>;

/// Context passed to rule and variant handlers.
pub struct RuleContext<'a> {
    pub raw_selector: &'a str,
    pub current_selector: &'a str,
    pub theme: &'a (dyn Any + Send + Sync),
    pub variant_handlers: &'a [AppliedVariantHandler],
    pub(crate) parent_orders: ParentOrders,
}

impl<'a> RuleContext<'a> {
    /// Synthesize a full CSS string for an ad-hoc body using the current
    /// variant stack: applies variants to `(0, overrideSelector ?? raw,
    /// normalizedBody, undefined, handlers)` and wraps with parent if any.
    #[must_use]
    pub fn construct_css(&self, body: Declarations, override_selector: Option<&str>) -> String {
        let raw = override_selector.unwrap_or(self.raw_selector);
        let parsed = crate::rule::ParsedUtility {
            order: 0,
            raw: raw.to_string(),
            entries: body,
            meta: cssgen_common::config::RuleMeta::default(),
            variant_handlers: self.variant_handlers.to_vec(),
        };
        let ctx = stringify::apply_variants(&parsed, &[]);
        let rendered_body = stringify::render_body(&ctx.entries);
        match ctx.parent {
            Some(parent) => format!("{parent}{{{}{{{rendered_body}}}}}", ctx.selector),
            None => format!("{}{{{rendered_body}}}", ctx.selector),
        }
    }

    pub(crate) fn record_parent_order(&self, name: &str, order: i32) {
        self.parent_orders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name.to_string(), order);
    }
}
