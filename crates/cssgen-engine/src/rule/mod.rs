use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cssgen_common::config::RuleMeta;
use cssgen_common::Declarations;
use regex::Regex;

use crate::context::RuleContext;
use crate::variant::AppliedVariantHandler;

/// A parsed utility: a rule match that still carries declarations and the
/// variant handlers that must be applied to it.
#[derive(Clone)]
pub struct ParsedUtility {
    pub order: i64,
    pub raw: String,
    pub entries: Declarations,
    pub meta: RuleMeta,
    pub variant_handlers: Vec<AppliedVariantHandler>,
}

/// A raw utility: a dynamic rule that returned a literal CSS body directly,
/// bypassing selector/variant composition.
#[derive(Clone)]
pub struct RawUtility {
    pub order: i64,
    pub body: String,
    pub meta: RuleMeta,
}

pub enum RuleOutcome {
    Parsed(ParsedUtility),
    Raw(RawUtility),
}

/// What a dynamic rule handler returns.
pub enum RuleHandlerOutput {
    Str(String),
    Decls(Declarations),
    DeclsList(Vec<Declarations>),
}

#[async_trait]
pub trait DynamicRuleHandler: Send + Sync {
    async fn handle(
        &self,
        captures: &regex::Captures<'_>,
        ctx: &RuleContext<'_>,
    ) -> Option<RuleHandlerOutput>;
}

pub struct StaticRule {
    pub key: String,
    pub declarations: Declarations,
    pub meta: RuleMeta,
}

pub struct DynamicRule {
    pub pattern: Regex,
    pub handler: Arc<dyn DynamicRuleHandler>,
    pub meta: RuleMeta,
}

/// Either a static (exact-key) or dynamic (regex) rule.
pub enum Rule {
    Static(StaticRule),
    Dynamic(DynamicRule),
}

/// Map a residual selector to stringifiable output.
///
/// `rules` is the full registration-order list (mixing static and dynamic
/// entries); `rules_static_map` indexes the latest static rule for a given
/// key directly. `internal` permits matching rules whose meta marks them
/// `internal` — set by the shortcut expander when re-entering the pipeline
/// for a shortcut's own sub-tokens.
pub async fn match_rule(
    rules: &[Rule],
    rules_static_map: &HashMap<String, usize>,
    raw: &str,
    residual: &str,
    handlers: &[AppliedVariantHandler],
    ctx: &RuleContext<'_>,
    internal: bool,
) -> Option<Vec<RuleOutcome>> {
    // 1. Static lookup.
    if let Some(&idx) = rules_static_map.get(residual) {
        if let Rule::Static(rule) = &rules[idx] {
            if internal || !rule.meta.internal {
                return Some(vec![RuleOutcome::Parsed(ParsedUtility {
                    order: idx as i64,
                    raw: raw.to_string(),
                    entries: rule.declarations.clone(),
                    meta: rule.meta.clone(),
                    variant_handlers: handlers.to_vec(),
                })]);
            }
        }
    }

    // 2. Dynamic scan, highest index to lowest: last registered wins.
    for idx in (0..rules.len()).rev() {
        let Rule::Dynamic(rule) = &rules[idx] else {
            continue;
        };
        if rule.meta.internal && !internal {
            continue;
        }
        let Some(captures) = rule.pattern.captures(residual) else {
            continue;
        };
        let Some(output) = rule.handler.handle(&captures, ctx).await else {
            continue;
        };
        return Some(render_dynamic_output(output, idx, raw, handlers, rule.meta.clone()));
    }

    None
}

fn render_dynamic_output(
    output: RuleHandlerOutput,
    idx: usize,
    raw: &str,
    handlers: &[AppliedVariantHandler],
    meta: RuleMeta,
) -> Vec<RuleOutcome> {
    match output {
        RuleHandlerOutput::Str(body) => vec![RuleOutcome::Raw(RawUtility {
            order: idx as i64,
            body,
            meta,
        })],
        RuleHandlerOutput::Decls(entries) => {
            if entries.is_empty() {
                Vec::new()
            } else {
                vec![RuleOutcome::Parsed(ParsedUtility {
                    order: idx as i64,
                    raw: raw.to_string(),
                    entries,
                    meta,
                    variant_handlers: handlers.to_vec(),
                })]
            }
        }
        RuleHandlerOutput::DeclsList(groups) => groups
            .into_iter()
            .filter(|g| !g.is_empty())
            .map(|entries| {
                RuleOutcome::Parsed(ParsedUtility {
                    order: idx as i64,
                    raw: raw.to_string(),
                    entries,
                    meta: meta.clone(),
                    variant_handlers: handlers.to_vec(),
                })
            })
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
