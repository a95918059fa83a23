use std::collections::HashSet;

use billsieve_core::{LineItem, Money};

use crate::config::ExtractionConfig;
use crate::rules::{RuleAction, RuleSet};

/// Final per-page pass over candidate items: drops non-positive amounts,
/// noise names and names without enough letters, then removes duplicates
/// keyed on `(amount to the cent, name prefix)`. First occurrence wins.
pub fn clean_page_items(
    items: Vec<LineItem>,
    rules: &RuleSet,
    config: &ExtractionConfig,
) -> Vec<LineItem> {
    let mut seen: HashSet<(i64, String)> = HashSet::new();
    let mut clean = Vec::with_capacity(items.len());

    for mut item in items {
        let Some(amount) = Money::from_f64(item.item_amount) else {
            continue;
        };
        if item.item_amount <= 0.0 {
            continue;
        }

        let name = item.item_name.trim().to_string();
        if rules.matches(RuleAction::NoiseName, &name) || rules.matches(RuleAction::Summary, &name) {
            tracing::debug!(name = %name, amount = item.item_amount, "dropping noise item");
            continue;
        }
        if item.name_alpha_count() < config.min_name_alpha {
            tracing::debug!(name = %name, "dropping short-alpha name");
            continue;
        }

        let key = (amount.to_cents(), name_key(&name, config.dedupe_name_prefix));
        if !seen.insert(key) {
            tracing::debug!(name = %name, amount = item.item_amount, "duplicate dropped");
            continue;
        }

        item.item_name = name;
        clean.push(item);
    }
    clean
}

/// Lowercased alphanumerics of the name, truncated to `prefix` characters.
fn name_key(name: &str, prefix: usize) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(prefix)
        .collect()
}
