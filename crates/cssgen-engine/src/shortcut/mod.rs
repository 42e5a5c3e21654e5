use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use cssgen_common::config::RuleMeta;
use regex::Regex;

use crate::context::RuleContext;

/// A shortcut expansion, either the literal string form (which still needs
/// variant-group expansion and whitespace splitting) or an already-split
/// list.
#[derive(Clone)]
pub enum ExpansionValue {
    Str(String),
    List(Vec<String>),
}

impl From<cssgen_common::config::ShortcutExpansion> for ExpansionValue {
    fn from(value: cssgen_common::config::ShortcutExpansion) -> Self {
        match value {
            cssgen_common::config::ShortcutExpansion::Single(s) => Self::Str(s),
            cssgen_common::config::ShortcutExpansion::Multiple(list) => Self::List(list),
        }
    }
}

#[async_trait]
pub trait DynamicShortcutHandler: Send + Sync {
    async fn handle(
        &self,
        captures: &regex::Captures<'_>,
        ctx: &RuleContext<'_>,
    ) -> Option<ExpansionValue>;
}

pub struct StaticShortcut {
    pub key: String,
    pub expansion: ExpansionValue,
    pub meta: RuleMeta,
}

pub struct DynamicShortcut {
    pub pattern: Regex,
    pub handler: Arc<dyn DynamicShortcutHandler>,
    pub meta: RuleMeta,
}

/// Either a static (exact-key) or dynamic (regex) shortcut.
pub enum Shortcut {
    Static(StaticShortcut),
    Dynamic(DynamicShortcut),
}

/// Maximum recursion depth for shortcut self-expansion.
pub const MAX_SHORTCUT_DEPTH: u32 = 3;

pub struct ShortcutExpansionResult {
    pub tokens: Vec<String>,
    pub meta: RuleMeta,
}

/// Split `s` on ASCII whitespace, ignoring whitespace nested inside
/// parentheses.
#[must_use]
pub fn split_top_level(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn find_matching_close(chars: &[char], open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, &c) in chars.iter().enumerate().skip(open_idx) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Expand a single (whitespace-free) token's variant-group syntax:
/// `prefix:(a b c)suffix → [prefix:a suffix, prefix:b suffix, prefix:c suffix]`,
/// recursing into arbitrarily nested groups on both the group contents and
/// anything trailing the closing paren.
#[must_use]
pub fn expand_variant_groups(token: &str) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    let Some(open_idx) = chars.iter().position(|&c| c == '(') else {
        return vec![token.to_string()];
    };
    let Some(close_idx) = find_matching_close(&chars, open_idx) else {
        return vec![token.to_string()];
    };

    let prefix: String = chars[..open_idx].iter().collect();
    let inner: String = chars[open_idx + 1..close_idx].iter().collect();
    let suffix: String = chars[close_idx + 1..].iter().collect();
    let suffix_variants = expand_variant_groups(&suffix);

    let mut out = Vec::new();
    for item in split_top_level(&inner) {
        for expanded_item in expand_variant_groups(&item) {
            for expanded_suffix in &suffix_variants {
                out.push(format!("{prefix}{expanded_item}{expanded_suffix}"));
            }
        }
    }
    out
}

/// Expand a shortcut's string-form expansion into its sub-tokens: split on
/// top-level whitespace, then expand variant-groups within each piece.
/// Equivalent to expanding variant-groups first and splitting afterward,
/// since a group never contains top-level whitespace outside its own
/// parens.
#[must_use]
pub fn expand_shortcut_string(s: &str) -> Vec<String> {
    split_top_level(s)
        .into_iter()
        .flat_map(|tok| expand_variant_groups(&tok))
        .collect()
}

type BoxExpandFuture<'a> = Pin<Box<dyn Future<Output = Option<ShortcutExpansionResult>> + Send + 'a>>;

/// Recursively expand `residual` into its flattened sub-tokens if it
/// matches a configured shortcut.
///
/// Scans `shortcuts` in registration order; the first match (static key
/// equality or dynamic pattern hit) wins. Returns `None` when nothing
/// matches, or when `depth` has been exhausted — the recursion cap is a
/// silent stop, not a fatal error.
#[must_use]
pub fn expand<'a>(
    shortcuts: &'a [Shortcut],
    residual: &'a str,
    ctx: &'a RuleContext<'a>,
) -> BoxExpandFuture<'a> {
    expand_at_depth(shortcuts, residual, ctx, MAX_SHORTCUT_DEPTH)
}

fn expand_at_depth<'a>(
    shortcuts: &'a [Shortcut],
    residual: &'a str,
    ctx: &'a RuleContext<'a>,
    depth: u32,
) -> BoxExpandFuture<'a> {
    Box::pin(async move {
        if depth == 0 {
            return None;
        }

        let mut hit: Option<(ExpansionValue, RuleMeta)> = None;
        for shortcut in shortcuts {
            match shortcut {
                Shortcut::Static(s) if s.key == residual => {
                    hit = Some((s.expansion.clone(), s.meta.clone()));
                    break;
                }
                Shortcut::Static(_) => {}
                Shortcut::Dynamic(d) => {
                    let Some(captures) = d.pattern.captures(residual) else {
                        continue;
                    };
                    if let Some(expansion) = d.handler.handle(&captures, ctx).await {
                        hit = Some((expansion, d.meta.clone()));
                        break;
                    }
                }
            }
        }
        let (expansion, meta) = hit?;

        let sub_tokens = match expansion {
            ExpansionValue::Str(s) => expand_shortcut_string(&s),
            ExpansionValue::List(list) => list,
        };

        let mut tokens = Vec::new();
        for token in sub_tokens {
            if token.is_empty() {
                continue;
            }
            match expand_at_depth(shortcuts, &token, ctx, depth - 1).await {
                Some(sub) => tokens.extend(sub.tokens),
                None => tokens.push(token),
            }
        }
        Some(ShortcutExpansionResult { tokens, meta })
    })
}
