use std::collections::{HashMap, HashSet};

use crate::config::SortLayersHook;
use crate::stringify::StringifiedUtility;

/// Stringified utilities grouped by their parent at-rule wrapper, `None`
/// meaning top-level.
pub type Sheet = HashMap<Option<String>, Vec<StringifiedUtility>>;

#[must_use]
pub fn build_sheet(utilities: Vec<StringifiedUtility>) -> Sheet {
    let mut sheet: Sheet = HashMap::new();
    for utility in utilities {
        sheet.entry(utility.parent.clone()).or_default().push(utility);
    }
    sheet
}

/// Every distinct effective layer name present in `sheet`, where the
/// effective layer is `meta.layer` or `"default"`.
#[must_use]
pub fn layer_names(sheet: &Sheet) -> HashSet<String> {
    sheet
        .values()
        .flatten()
        .map(|u| u.meta.layer.clone().unwrap_or_else(|| "default".to_string()))
        .collect()
}

/// Order layer names by configured numeric weight, falling back to
/// lexicographic order for ties, then run the optional `sortLayers` hook.
#[must_use]
pub fn sorted_layer_names(
    mut names: Vec<String>,
    layers: &HashMap<String, i32>,
    sort_layers: Option<&SortLayersHook>,
) -> Vec<String> {
    names.sort_by(|a, b| {
        let wa = layers.get(a).copied().unwrap_or(0);
        let wb = layers.get(b).copied().unwrap_or(0);
        wa.cmp(&wb).then_with(|| a.cmp(b))
    });
    if let Some(hook) = sort_layers {
        names = hook(names);
    }
    names
}

fn parent_sort_key(parent: &Option<String>, parent_orders: &HashMap<String, i32>) -> (i32, String) {
    match parent {
        None => (0, String::new()),
        Some(name) => (parent_orders.get(name).copied().unwrap_or(0), name.clone()),
    }
}

const SCOPE_PLACEHOLDER: &str = " $$ ";

/// Substitute the scope placeholder, or prefix the scope, into `selector`.
#[must_use]
pub fn apply_scope(selector: &str, scope: Option<&str>) -> String {
    if selector.contains(SCOPE_PLACEHOLDER) {
        let replacement = scope.map_or_else(|| " ".to_string(), |s| format!(" {s} "));
        selector.replace(SCOPE_PLACEHOLDER, &replacement)
    } else if let Some(scope) = scope {
        format!("{scope} {selector}")
    } else {
        selector.to_string()
    }
}

enum RenderUnit {
    Raw(String),
    Styled {
        selectors: Vec<String>,
        body: String,
        no_merge: bool,
    },
}

/// Reverse-scan selector merge: later-occurring utilities with an
/// identical body absorb earlier ones' selectors, preserving the later
/// utility's cascade position.
fn merge_selectors_in_place(units: &mut Vec<RenderUnit>) {
    let mut body_to_index: HashMap<String, usize> = HashMap::new();
    let mut drop = vec![false; units.len()];

    for i in (0..units.len()).rev() {
        let RenderUnit::Styled { body, no_merge, .. } = &units[i] else {
            continue;
        };
        if *no_merge {
            continue;
        }
        let body_key = body.clone();
        if let Some(&target) = body_to_index.get(&body_key) {
            let moved: Vec<String> = match &units[i] {
                RenderUnit::Styled { selectors, .. } => selectors.clone(),
                RenderUnit::Raw(_) => unreachable!(),
            };
            if let RenderUnit::Styled { selectors, .. } = &mut units[target] {
                for s in moved {
                    if !selectors.contains(&s) {
                        selectors.push(s);
                    }
                }
            }
            drop[i] = true;
        } else {
            body_to_index.insert(body_key, i);
        }
    }

    let mut idx = 0;
    units.retain(|_| {
        let keep = !drop[idx];
        idx += 1;
        keep
    });
}

fn render_unit(unit: &RenderUnit) -> String {
    match unit {
        RenderUnit::Raw(body) => body.clone(),
        RenderUnit::Styled { selectors, body, .. } => {
            format!("{}{{{body}}}", selectors.join(","))
        }
    }
}

/// Render one layer's CSS body (no preflights, no layer comment — the
/// caller prepends those, since preflight CSS may require awaiting a
/// dynamic provider).
#[must_use]
pub fn assemble_layer(
    sheet: &Sheet,
    parent_orders: &HashMap<String, i32>,
    layer: &str,
    scope: Option<&str>,
    merge_selectors: bool,
) -> String {
    let mut parents: Vec<&Option<String>> = sheet.keys().collect();
    parents.sort_by(|a, b| parent_sort_key(a, parent_orders).cmp(&parent_sort_key(b, parent_orders)));

    let mut out = String::new();
    for parent in parents {
        #[allow(clippy::unwrap_used)]
        let utilities = sheet.get(parent).unwrap();
        let mut filtered: Vec<&StringifiedUtility> = utilities
            .iter()
            .filter(|u| u.meta.layer.as_deref().unwrap_or("default") == layer)
            .collect();
        if filtered.is_empty() {
            continue;
        }
        filtered.sort_by(|a, b| {
            a.order.cmp(&b.order).then_with(|| {
                a.selector
                    .as_deref()
                    .unwrap_or("")
                    .cmp(b.selector.as_deref().unwrap_or(""))
            })
        });

        let mut units: Vec<RenderUnit> = filtered
            .into_iter()
            .map(|u| match &u.selector {
                None => RenderUnit::Raw(u.body.clone()),
                Some(sel) => RenderUnit::Styled {
                    selectors: vec![apply_scope(sel, scope)],
                    body: u.body.clone(),
                    no_merge: u.meta.no_merge,
                },
            })
            .collect();

        if merge_selectors {
            merge_selectors_in_place(&mut units);
        }

        let body: String = units.iter().map(render_unit).collect();
        if body.is_empty() {
            continue;
        }

        match parent {
            Some(p) => out.push_str(&format!("{p}{{{body}}}")),
            None => out.push_str(&body),
        }
    }
    out
}
