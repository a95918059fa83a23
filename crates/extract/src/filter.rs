use billsieve_core::Line;

use crate::rules::{RuleAction, RuleSet};

/// Drops lines that can never carry an item: blanks, header/footer and URL
/// matter, short stray words and bare page numbers. Order is preserved.
pub fn filter_noise_lines(lines: Vec<Line>, rules: &RuleSet) -> Vec<Line> {
    lines
        .into_iter()
        .filter(|line| match rejection_reason(&line.text, rules) {
            Some(reason) => {
                tracing::debug!(text = %line.text, reason, "dropping noise line");
                false
            }
            None => true,
        })
        .collect()
}

fn rejection_reason<'a>(text: &str, rules: &'a RuleSet) -> Option<&'a str> {
    let t = text.trim();
    if t.is_empty() {
        return Some("empty");
    }
    if let Some(rule) = rules.first_match(RuleAction::HeaderFooter, t) {
        return Some(rule.name.as_str());
    }

    let tokens: Vec<&str> = t.split_whitespace().collect();
    if let [only] = tokens.as_slice() {
        let len = only.chars().count();
        if len <= 4 && only.chars().all(char::is_alphabetic) {
            return Some("short word");
        }
        if len <= 3 && only.chars().all(|c| c.is_ascii_digit()) {
            return Some("page number");
        }
    }
    None
}
