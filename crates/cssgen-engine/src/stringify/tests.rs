use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cssgen_common::declaration::NO_MERGE_MARKER;

use crate::rule::{DynamicRuleHandler, RuleHandlerOutput};
use crate::variant::{AppliedVariantHandler, ParentSpec, Variant, VariantMatch};

use super::*;

fn test_ctx() -> RuleContext<'static> {
    RuleContext {
        raw_selector: "",
        current_selector: "",
        theme: &(),
        variant_handlers: &[],
        parent_orders: Arc::new(Mutex::new(HashMap::new())),
    }
}

#[test]
fn escaped_selector_for_plain_class() {
    assert_eq!(to_escaped_selector("m-2"), ".m-2");
}

#[test]
fn escaped_selector_escapes_special_chars() {
    assert_eq!(to_escaped_selector("sm:m-2"), r".sm\:m-2");
}

#[test]
fn escaped_selector_for_attribute_form() {
    assert_eq!(
        to_escaped_selector(r#"[data-foo="bar"]"#),
        r#"[data-foo="bar"]"#
    );
}

#[test]
fn render_body_joins_and_drops_marker() {
    let mut decls = Declarations::new();
    decls.push("margin", "0.5rem");
    decls.push(NO_MERGE_MARKER, "1");
    decls.push("color", "red");
    assert_eq!(render_body(&decls), "margin:0.5rem;color:red");
}

fn hover_handler() -> AppliedVariantHandler {
    AppliedVariantHandler {
        body: None,
        selector: Some(Arc::new(|sel, _| format!("{sel}:hover"))),
        parent: None,
        layer: None,
        order: 0,
    }
}

fn dark_parent_handler() -> AppliedVariantHandler {
    AppliedVariantHandler {
        body: None,
        selector: None,
        parent: Some(ParentSpec::Plain("@media (prefers-color-scheme: dark)".to_string())),
        layer: Some("theme".to_string()),
        order: 1,
    }
}

#[test]
fn apply_variants_composes_selector_in_order_and_tracks_parent_layer() {
    let mut entries = Declarations::new();
    entries.push("color", "black");
    let parsed = ParsedUtility {
        order: 0,
        raw: "dark:hover:text-black".to_string(),
        entries,
        meta: RuleMeta::default(),
        variant_handlers: vec![hover_handler(), dark_parent_handler()],
    };
    let ctx = apply_variants(&parsed, &[]);
    assert_eq!(ctx.selector, ".dark\\:hover\\:text-black:hover");
    assert_eq!(ctx.parent.as_deref(), Some("@media (prefers-color-scheme: dark)"));
    assert_eq!(ctx.layer.as_deref(), Some("theme"));
}

#[test]
fn apply_variants_runs_postprocess_hooks() {
    let mut entries = Declarations::new();
    entries.push("color", "black");
    let parsed = ParsedUtility {
        order: 0,
        raw: "text-black".to_string(),
        entries,
        meta: RuleMeta::default(),
        variant_handlers: Vec::new(),
    };
    let hook: PostHook = Arc::new(|mut ctx: StringifyCtx| {
        ctx.selector.push_str("__marked");
        ctx
    });
    let ctx = apply_variants(&parsed, &[hook]);
    assert_eq!(ctx.selector, ".text-black__marked");
}

#[test]
fn stringify_outcome_drops_empty_raw_body() {
    let raw = crate::rule::RawUtility {
        order: 0,
        body: String::new(),
        meta: RuleMeta::default(),
    };
    assert!(stringify_outcome(RuleOutcome::Raw(raw), &[]).is_none());
}

#[test]
fn stringify_outcome_drops_empty_parsed_body() {
    let parsed = ParsedUtility {
        order: 0,
        raw: "hidden".to_string(),
        entries: Declarations::new(),
        meta: RuleMeta::default(),
        variant_handlers: Vec::new(),
    };
    assert!(stringify_outcome(RuleOutcome::Parsed(parsed), &[]).is_none());
}

#[test]
fn stringify_outcome_promotes_marker_to_no_merge_meta() {
    let mut entries = Declarations::new();
    entries.push("color", "red");
    entries.push(NO_MERGE_MARKER, "1");
    let parsed = ParsedUtility {
        order: 2,
        raw: "marked".to_string(),
        entries,
        meta: RuleMeta::default(),
        variant_handlers: Vec::new(),
    };
    let out = stringify_outcome(RuleOutcome::Parsed(parsed), &[]).unwrap();
    assert!(out.meta.no_merge);
    assert_eq!(out.body, "color:red");
}

struct StaticDecls(Vec<(&'static str, &'static str)>);

#[async_trait]
impl DynamicRuleHandler for StaticDecls {
    async fn handle(
        &self,
        _captures: &regex::Captures<'_>,
        _ctx: &RuleContext<'_>,
    ) -> Option<RuleHandlerOutput> {
        let mut decls = Declarations::new();
        for (k, v) in &self.0 {
            decls.push(*k, *v);
        }
        Some(RuleHandlerOutput::Decls(decls))
    }
}

struct AlwaysMissVariant;

#[async_trait]
impl Variant for AlwaysMissVariant {
    async fn try_match(&self, _current: &str, _ctx: &RuleContext<'_>) -> Option<VariantMatch> {
        None
    }
}

fn shortcut_rules() -> (Vec<Rule>, HashMap<String, usize>) {
    let rules = vec![
        Rule::Dynamic(crate::rule::DynamicRule {
            pattern: Regex::new(r"^m-(\d+)$").unwrap(),
            handler: Arc::new(StaticDecls(vec![("margin", "0.5rem")])),
            meta: RuleMeta::default(),
        }),
        Rule::Dynamic(crate::rule::DynamicRule {
            pattern: Regex::new(r"^p-(\d+)$").unwrap(),
            handler: Arc::new(StaticDecls(vec![("padding", "0.5rem")])),
            meta: RuleMeta::default(),
        }),
    ];
    let mut map = HashMap::new();
    for (i, rule) in rules.iter().enumerate() {
        if let Rule::Static(r) = rule {
            map.insert(r.key.clone(), i);
        }
    }
    (rules, map)
}

#[tokio::test]
async fn stringify_shortcut_dedups_and_merges_into_one_bucket() {
    let (rules, map) = shortcut_rules();
    let variants: Vec<Arc<dyn Variant>> = vec![Arc::new(AlwaysMissVariant)];
    let ctx = test_ctx();
    let warner = Warner::new();
    let out = stringify_shortcut(
        &rules,
        &map,
        &variants,
        "btn",
        &[],
        vec!["m-2".to_string(), "p-2".to_string(), "m-2".to_string()],
        &RuleMeta::default(),
        "shortcuts",
        &[],
        &ctx,
        &warner,
        "btn",
    )
    .await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].selector.as_deref(), Some(".btn"));
    assert_eq!(out[0].body, "margin:0.5rem;padding:0.5rem");
    assert_eq!(out[0].meta.layer.as_deref(), Some("shortcuts"));
    assert!(!warner.has_warned("shortcut:btn:m-2"));
}

#[tokio::test]
async fn stringify_shortcut_warns_on_unmatched_sub_token() {
    let (rules, map) = shortcut_rules();
    let variants: Vec<Arc<dyn Variant>> = Vec::new();
    let ctx = test_ctx();
    let warner = Warner::new();
    let out = stringify_shortcut(
        &rules,
        &map,
        &variants,
        "btn",
        &[],
        vec!["m-2".to_string(), "totally-unknown".to_string()],
        &RuleMeta::default(),
        "shortcuts",
        &[],
        &ctx,
        &warner,
        "btn",
    )
    .await;

    assert_eq!(out.len(), 1);
    assert!(warner.has_warned("shortcut:btn:totally-unknown"));
}

#[tokio::test]
async fn stringify_shortcut_keeps_no_merge_entries_separate() {
    let rules = vec![
        Rule::Dynamic(crate::rule::DynamicRule {
            pattern: Regex::new(r"^a$").unwrap(),
            handler: Arc::new(StaticDecls(vec![("color", "red")])),
            meta: RuleMeta::default(),
        }),
        Rule::Dynamic(crate::rule::DynamicRule {
            pattern: Regex::new(r"^b$").unwrap(),
            handler: Arc::new(StaticDecls(vec![("background", "blue")])),
            meta: RuleMeta {
                no_merge: true,
                ..RuleMeta::default()
            },
        }),
    ];
    let map = HashMap::new();
    let variants: Vec<Arc<dyn Variant>> = Vec::new();
    let ctx = test_ctx();
    let warner = Warner::new();
    let out = stringify_shortcut(
        &rules,
        &map,
        &variants,
        "combo",
        &[],
        vec!["a".to_string(), "b".to_string()],
        &RuleMeta::default(),
        "shortcuts",
        &[],
        &ctx,
        &warner,
        "combo",
    )
    .await;

    assert_eq!(out.len(), 2);
    let merged = out.iter().find(|u| u.body.contains("color")).unwrap();
    let separate = out.iter().find(|u| u.body.contains("background")).unwrap();
    assert!(!merged.meta.no_merge);
    assert!(separate.meta.no_merge);
}
