use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

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

fn static_rules_map(rules: &[Rule]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (i, rule) in rules.iter().enumerate() {
        if let Rule::Static(r) = rule {
            map.insert(r.key.clone(), i);
        }
    }
    map
}

struct EchoPadding;

#[async_trait]
impl DynamicRuleHandler for EchoPadding {
    async fn handle(
        &self,
        captures: &regex::Captures<'_>,
        _ctx: &RuleContext<'_>,
    ) -> Option<RuleHandlerOutput> {
        let n: f64 = captures.get(1)?.as_str().parse().ok()?;
        let mut decls = Declarations::new();
        decls.push("padding", format!("{}rem", n * 0.25));
        Some(RuleHandlerOutput::Decls(decls))
    }
}

#[tokio::test]
async fn static_rule_matches_exact_key() {
    let mut decls = Declarations::new();
    decls.push("margin", "0.5rem");
    let rules = vec![Rule::Static(StaticRule {
        key: "m-2".to_string(),
        declarations: decls,
        meta: RuleMeta::default(),
    })];
    let map = static_rules_map(&rules);
    let ctx = test_ctx();
    let outcome = match_rule(&rules, &map, "m-2", "m-2", &[], &ctx, false)
        .await
        .unwrap();
    assert_eq!(outcome.len(), 1);
    assert!(matches!(&outcome[0], RuleOutcome::Parsed(p) if p.order == 0));
}

#[tokio::test]
async fn dynamic_rule_matches_pattern_and_computes_value() {
    let rules = vec![Rule::Dynamic(DynamicRule {
        pattern: Regex::new(r"^p-(\d+)$").unwrap(),
        handler: Arc::new(EchoPadding),
        meta: RuleMeta::default(),
    })];
    let map = static_rules_map(&rules);
    let ctx = test_ctx();
    let outcome = match_rule(&rules, &map, "p-4", "p-4", &[], &ctx, false)
        .await
        .unwrap();
    let RuleOutcome::Parsed(p) = &outcome[0] else {
        panic!("expected parsed utility")
    };
    assert_eq!(p.entries.0[0], ("padding".to_string(), "1rem".to_string()));
}

#[tokio::test]
async fn internal_rules_require_internal_flag() {
    let rules = vec![Rule::Static(StaticRule {
        key: "hidden".to_string(),
        declarations: Declarations::new(),
        meta: RuleMeta {
            internal: true,
            ..RuleMeta::default()
        },
    })];
    let map = static_rules_map(&rules);
    let ctx = test_ctx();
    assert!(
        match_rule(&rules, &map, "hidden", "hidden", &[], &ctx, false)
            .await
            .is_none()
    );
    assert!(
        match_rule(&rules, &map, "hidden", "hidden", &[], &ctx, true)
            .await
            .is_some()
    );
}

#[tokio::test]
async fn dynamic_scan_prefers_last_registered() {
    struct Fixed(&'static str);
    #[async_trait]
    impl DynamicRuleHandler for Fixed {
        async fn handle(
            &self,
            _captures: &regex::Captures<'_>,
            _ctx: &RuleContext<'_>,
        ) -> Option<RuleHandlerOutput> {
            Some(RuleHandlerOutput::Str(self.0.to_string()))
        }
    }
    let rules = vec![
        Rule::Dynamic(DynamicRule {
            pattern: Regex::new(r"^x$").unwrap(),
            handler: Arc::new(Fixed("first")),
            meta: RuleMeta::default(),
        }),
        Rule::Dynamic(DynamicRule {
            pattern: Regex::new(r"^x$").unwrap(),
            handler: Arc::new(Fixed("second")),
            meta: RuleMeta::default(),
        }),
    ];
    let map = static_rules_map(&rules);
    let ctx = test_ctx();
    let outcome = match_rule(&rules, &map, "x", "x", &[], &ctx, false)
        .await
        .unwrap();
    let RuleOutcome::Raw(r) = &outcome[0] else {
        panic!("expected raw utility")
    };
    assert_eq!(r.body, "second");
}

#[tokio::test]
async fn empty_declaration_groups_are_filtered() {
    struct EmptyThenNonEmpty;
    #[async_trait]
    impl DynamicRuleHandler for EmptyThenNonEmpty {
        async fn handle(
            &self,
            _captures: &regex::Captures<'_>,
            _ctx: &RuleContext<'_>,
        ) -> Option<RuleHandlerOutput> {
            let mut non_empty = Declarations::new();
            non_empty.push("color", "red");
            Some(RuleHandlerOutput::DeclsList(vec![
                Declarations::new(),
                non_empty,
            ]))
        }
    }
    let rules = vec![Rule::Dynamic(DynamicRule {
        pattern: Regex::new(r"^y$").unwrap(),
        handler: Arc::new(EmptyThenNonEmpty),
        meta: RuleMeta::default(),
    })];
    let map = static_rules_map(&rules);
    let ctx = test_ctx();
    let outcome = match_rule(&rules, &map, "y", "y", &[], &ctx, false)
        .await
        .unwrap();
    assert_eq!(outcome.len(), 1);
}

#[tokio::test]
async fn no_match_returns_none() {
    let rules: Vec<Rule> = Vec::new();
    let map = static_rules_map(&rules);
    let ctx = test_ctx();
    assert!(
        match_rule(&rules, &map, "unknown", "unknown", &[], &ctx, false)
            .await
            .is_none()
    );
}
