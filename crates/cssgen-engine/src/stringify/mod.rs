use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cssgen_common::config::RuleMeta;
use cssgen_common::Declarations;
use regex::Regex;

use crate::context::RuleContext;
use crate::rule::{self, ParsedUtility, Rule, RuleOutcome};
use crate::variant::{self, AppliedVariantHandler, Variant};
use crate::warn::Warner;

/// The selector/entries/parent/layer triple variants fold over, and the
/// shape postprocess hooks transform.
#[derive(Clone)]
pub struct StringifyCtx {
    pub selector: String,
    pub entries: Declarations,
    pub parent: Option<String>,
    pub layer: Option<String>,
}

pub type PostHook = Arc<dyn Fn(StringifyCtx) -> StringifyCtx + Send + Sync>;

/// A terminal, renderable utility.
#[derive(Clone)]
pub struct StringifiedUtility {
    pub order: i64,
    pub selector: Option<String>,
    pub body: String,
    pub parent: Option<String>,
    pub meta: RuleMeta,
}

fn escape_ident(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

fn attribute_selector_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r#"^\[([^=~\]]+)(=|~=)"([^"]*)"\]$"#).unwrap()
    })
}

/// Escape `raw` into a CSS selector, recognizing `[name=value]` /
/// `[name~=value]` attribute-selector syntax and falling back to a
/// class selector otherwise.
#[must_use]
pub fn to_escaped_selector(raw: &str) -> String {
    if let Some(caps) = attribute_selector_re().captures(raw) {
        let name = escape_ident(&caps[1]);
        let op = &caps[2];
        let value = escape_ident(&caps[3]);
        format!("[{name}{op}\"{value}\"]")
    } else {
        format!(".{}", escape_ident(raw))
    }
}

/// Render a declaration list to a CSS body string, dropping the no-merge
/// control marker first.
#[must_use]
pub fn render_body(entries: &Declarations) -> String {
    entries
        .without_marker()
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Apply a parsed utility's variant handlers, in ascending order, to
/// produce the final selector/entries/parent/layer.
#[must_use]
pub fn apply_variants(parsed: &ParsedUtility, postprocess: &[PostHook]) -> StringifyCtx {
    let mut handlers: Vec<&AppliedVariantHandler> = parsed.variant_handlers.iter().collect();
    handlers.sort_by_key(|h| h.order);

    let mut entries = parsed.entries.clone();
    for h in &handlers {
        if let Some(body_fn) = &h.body {
            entries = body_fn(entries);
        }
    }

    let mut selector = to_escaped_selector(&parsed.raw);
    for h in &handlers {
        if let Some(selector_fn) = &h.selector {
            selector = selector_fn(&selector, &entries);
        }
    }

    let mut parent = None;
    let mut layer = None;
    for h in &handlers {
        if let Some(p) = &h.parent {
            parent = Some(p.name().to_string());
        }
        if let Some(l) = &h.layer {
            layer = Some(l.clone());
        }
    }

    let mut ctx = StringifyCtx {
        selector,
        entries,
        parent,
        layer,
    };
    for hook in postprocess {
        ctx = hook(ctx);
    }
    ctx
}

/// Stringify a single rule-match outcome. Returns `None` when the
/// rendered body is empty.
#[must_use]
pub fn stringify_outcome(
    outcome: RuleOutcome,
    postprocess: &[PostHook],
) -> Option<StringifiedUtility> {
    match outcome {
        RuleOutcome::Raw(raw) => {
            if raw.body.is_empty() {
                None
            } else {
                Some(StringifiedUtility {
                    order: raw.order,
                    selector: None,
                    body: raw.body,
                    parent: None,
                    meta: raw.meta,
                })
            }
        }
        RuleOutcome::Parsed(parsed) => {
            let order = parsed.order;
            let rule_layer = parsed.meta.layer.clone();
            let mut meta = parsed.meta.clone();
            let ctx = apply_variants(&parsed, postprocess);
            let body = render_body(&ctx.entries);
            if body.is_empty() {
                return None;
            }
            meta.layer = ctx.layer.or(rule_layer);
            meta.no_merge = meta.no_merge || ctx.entries.has_no_merge_marker();
            Some(StringifiedUtility {
                order,
                selector: Some(ctx.selector),
                body,
                parent: ctx.parent,
                meta,
            })
        }
    }
}

/// One emitted, pre-assembly unit produced by bucketing a shortcut's
/// sub-utilities.
struct Bucket {
    min_order: i64,
    selector: String,
    parent: Option<String>,
    entries: Vec<(Declarations, bool)>,
}

/// Stringify a shortcut's expanded sub-tokens. `parent_raw`/
/// `parent_handlers` identify the shortcut's own token and variant
/// stack; selectors in the output target the shortcut itself, never its
/// sub-tokens.
#[allow(clippy::too_many_arguments)]
pub async fn stringify_shortcut(
    rules: &[Rule],
    rules_static_map: &HashMap<String, usize>,
    variants: &[Arc<dyn Variant>],
    parent_raw: &str,
    parent_handlers: &[AppliedVariantHandler],
    expanded_tokens: Vec<String>,
    shortcut_meta: &RuleMeta,
    default_layer: &str,
    postprocess: &[PostHook],
    ctx: &RuleContext<'_>,
    warner: &Warner,
    owning_shortcut: &str,
) -> Vec<StringifiedUtility> {
    // 1. Dedup expanded tokens, preserving first occurrence.
    let mut seen = std::collections::HashSet::new();
    let tokens: Vec<String> = expanded_tokens
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();

    // 2. Match variants + rules for each sub-token (internal = true).
    struct SubMatch {
        order: i64,
        entries: Declarations,
        rule_no_merge: bool,
        own_handlers: Vec<AppliedVariantHandler>,
    }
    let mut matches: Vec<SubMatch> = Vec::new();
    for token in &tokens {
        let own = match variant::match_variants(variants, token, None, ctx).await {
            Ok(own) => own,
            Err(_) => continue,
        };
        let outcomes = rule::match_rule(
            rules,
            rules_static_map,
            token,
            &own.residual,
            &own.handlers,
            ctx,
            true,
        )
        .await;
        match outcomes {
            None => {
                warner.warn_once(
                    &format!("shortcut:{owning_shortcut}:{token}"),
                    &format!(
                        "shortcut `{owning_shortcut}` sub-token `{token}` matched no rule"
                    ),
                );
            }
            Some(outcomes) => {
                // 3. Drop raw utilities; only parsed utilities carry
                // selector/variant information a shortcut can recompose.
                for outcome in outcomes {
                    if let RuleOutcome::Parsed(parsed) = outcome {
                        matches.push(SubMatch {
                            order: parsed.order,
                            entries: parsed.entries,
                            rule_no_merge: parsed.meta.no_merge,
                            own_handlers: own.handlers.clone(),
                        });
                    }
                }
            }
        }
    }

    // 3 (cont'd). Stable-sort by order asc.
    matches.sort_by_key(|m| m.order);

    // 4. Apply variants with handlers = ownHandlers ++ parentHandlers and
    // raw = parentRaw, so selectors target the shortcut's own class.
    let mut buckets: Vec<Bucket> = Vec::new();
    for m in matches {
        let mut combined = m.own_handlers;
        combined.extend(parent_handlers.iter().cloned());
        let parsed = ParsedUtility {
            order: m.order,
            raw: parent_raw.to_string(),
            entries: m.entries,
            meta: RuleMeta::default(),
            variant_handlers: combined,
        };
        let ctx_out = apply_variants(&parsed, postprocess);

        // 5. Group by (selector, parent).
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.selector == ctx_out.selector && b.parent == ctx_out.parent)
        {
            bucket.min_order = bucket.min_order.min(m.order);
            bucket.entries.push((ctx_out.entries, m.rule_no_merge));
        } else {
            buckets.push(Bucket {
                min_order: m.order,
                selector: ctx_out.selector,
                parent: ctx_out.parent,
                entries: vec![(ctx_out.entries, m.rule_no_merge)],
            });
        }
    }

    // 6. Split each bucket's entries into streams by the rule's noMerge
    // flag; within each stream, marker-bearing entries always emit
    // separately while the rest merge into one body.
    let layer = shortcut_meta
        .layer
        .clone()
        .unwrap_or_else(|| default_layer.to_string());
    let mut out = Vec::new();
    for bucket in buckets {
        let (no_merge_group, merge_group): (Vec<_>, Vec<_>) =
            bucket.entries.into_iter().partition(|(_, flag)| *flag);

        for (group, no_merge_flag) in [(no_merge_group, true), (merge_group, false)] {
            let (marked, mergeable): (Vec<_>, Vec<_>) = group
                .into_iter()
                .map(|(entries, _)| entries)
                .partition(Declarations::has_no_merge_marker);

            for entries in marked {
                emit_bucket_unit(
                    &mut out,
                    &bucket.selector,
                    &bucket.parent,
                    bucket.min_order,
                    entries,
                    no_merge_flag,
                    &layer,
                    shortcut_meta,
                );
            }
            if !mergeable.is_empty() {
                let mut merged = Declarations::new();
                for entries in &mergeable {
                    merged.0.extend(entries.0.iter().cloned());
                }
                emit_bucket_unit(
                    &mut out,
                    &bucket.selector,
                    &bucket.parent,
                    bucket.min_order,
                    merged,
                    no_merge_flag,
                    &layer,
                    shortcut_meta,
                );
            }
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn emit_bucket_unit(
    out: &mut Vec<StringifiedUtility>,
    selector: &str,
    parent: &Option<String>,
    min_order: i64,
    entries: Declarations,
    no_merge: bool,
    layer: &str,
    shortcut_meta: &RuleMeta,
) {
    let body = render_body(&entries);
    if body.is_empty() {
        return;
    }
    out.push(StringifiedUtility {
        order: min_order,
        selector: Some(selector.to_string()),
        body,
        parent: parent.clone(),
        meta: RuleMeta {
            layer: Some(layer.to_string()),
            internal: shortcut_meta.internal,
            no_merge,
        },
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
