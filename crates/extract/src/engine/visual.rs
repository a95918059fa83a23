use billsieve_core::model::alpha_count;
use billsieve_core::{Line, LineItem, Origin};

use super::ExtractionStrategy;
use crate::column::near_column;
use crate::config::ExtractionConfig;
use crate::rules::{RuleAction, RuleSet};
use crate::text::{
    clean_record_noise, is_money_only, is_numeric_only, is_price_token, looks_like_money,
    name_from_text, numeric_tokens, parse_candidate_amount, parse_money, re,
};

// name, quantity, rate, optional tax, amount; several may share one line.
re!(re_split_item,
    r"\s*(?P<name>.*?)\s+(?P<qty>\d[\d,]*(?:\.\d+)?)\s+(?P<rate>\d[\d,]*(?:\.\d+)?)(?:\s+\d[\d,]*(?:\.\d+)?)?\s+(?P<amount>\d[\d,]*(?:\.\d+)?)(?:\s|$)");

/// What a single line contributed, and how many lines it used up.
#[derive(Debug)]
enum LineOutcome {
    /// Not an item line; ends any name continuation.
    Skip,
    Split(Vec<LineItem>),
    Item { item: LineItem, consumed: usize },
    /// An amount was found but the name was unusable.
    ShortName { consumed: usize },
    /// No amount; the line may continue the previous item's name.
    NoAmount { consumed: usize },
}

/// Reads items from the page layout: an amount in the amount column, a name
/// to its left, and optional quantity and rate in between.
pub struct VisualParser<'a> {
    rules: &'a RuleSet,
    config: &'a ExtractionConfig,
}

impl<'a> VisualParser<'a> {
    pub fn new(rules: &'a RuleSet, config: &'a ExtractionConfig) -> Self {
        Self { rules, config }
    }

    fn below_confidence(&self, line: &Line) -> bool {
        line.avg_confidence >= 0 && line.avg_confidence < self.config.line_min_confidence
    }

    /// Splits a line holding one or more full `name qty rate [tax] amount`
    /// rows. `None` when nothing usable matched.
    fn split_merged_line(&self, text: &str, confidence: i32) -> Option<Vec<LineItem>> {
        let candidates: Vec<LineItem> = re_split_item()
            .captures_iter(text)
            .filter_map(|c| {
                let name = name_from_text(c.name("name")?.as_str());
                let amount = parse_money(c.name("amount")?.as_str());
                if name.is_empty() || amount <= 0.0 {
                    return None;
                }
                Some(LineItem {
                    item_name: name,
                    item_quantity: parse_money(c.name("qty")?.as_str()),
                    item_rate: parse_money(c.name("rate")?.as_str()),
                    item_amount: amount,
                    confidence,
                    origin: Origin::SplitLine,
                })
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }
        tracing::debug!(count = candidates.len(), text, "split merged line");
        Some(
            candidates
                .into_iter()
                .filter(|it| alpha_count(&it.item_name) >= self.config.min_name_alpha)
                .collect(),
        )
    }

    fn classify(&self, lines: &[Line], i: usize, amount_column: Option<i32>) -> LineOutcome {
        let line = &lines[i];
        let raw = line.text.trim();
        if raw.is_empty() || self.below_confidence(line) {
            return LineOutcome::Skip;
        }

        if let Some(split) = self.split_merged_line(raw, line.avg_confidence) {
            return LineOutcome::Split(split);
        }

        if self.rules.matches(RuleAction::StructuredRecord, raw)
            || self.rules.matches(RuleAction::Summary, raw)
            || is_numeric_only(raw)
        {
            return LineOutcome::Skip;
        }

        let Some(rightmost) = line.rightmost() else {
            return LineOutcome::Skip;
        };

        let tolerance = self.config.amount_tolerance;
        let numbers = numeric_tokens(raw);
        let nth_from_end = |n: usize| {
            numbers
                .len()
                .checked_sub(n)
                .map_or(0.0, |idx| parse_money(numbers[idx]))
        };

        let mut consumed = 1;
        let mut quantity = 0.0;
        let mut rate = 0.0;
        let mut amount: Option<(f64, &str)> = None;

        if is_price_token(&rightmost.text) && near_column(rightmost.left, amount_column, tolerance) {
            amount = Some((parse_candidate_amount(&rightmost.text), rightmost.text.as_str()));
            // The last number is the amount itself.
            if numbers.len() >= 2 {
                rate = nth_from_end(2);
            }
            if numbers.len() >= 3 {
                quantity = nth_from_end(3);
            }
        } else if let Some(next) = lines.get(i + 1) {
            let next_text = next.text.trim();
            let aligned = next
                .rightmost()
                .is_some_and(|w| near_column(w.left, amount_column, tolerance));
            if !next_text.is_empty() && is_money_only(next_text) && looks_like_money(next_text) && aligned {
                amount = Some((parse_candidate_amount(next_text), next_text));
                // The amount is on the next line, so every number here is quantity or rate.
                if numbers.len() >= 2 {
                    rate = nth_from_end(1);
                }
                if numbers.len() >= 3 {
                    quantity = nth_from_end(2);
                }
                consumed = 2;
            }
        }

        let Some((amount, token)) = amount.filter(|(a, _)| *a > 0.0) else {
            return LineOutcome::NoAmount { consumed };
        };
        let name = name_from_text(raw);

        if quantity == 0.0 && rate == 0.0 {
            if !looks_like_money(token) {
                tracing::debug!(name = %name, token, "drop: amount not money-shaped");
                return LineOutcome::NoAmount { consumed };
            }
            if self.rules.matches(RuleAction::NoiseName, &name) {
                tracing::debug!(name = %name, amount, "drop: noise word in name");
                return LineOutcome::NoAmount { consumed };
            }
            if alpha_count(&name) < self.config.min_name_alpha {
                tracing::debug!(name = %name, amount, "drop: name lacks letters");
                return LineOutcome::NoAmount { consumed };
            }
        }

        if alpha_count(&name) < self.config.min_name_alpha {
            tracing::debug!(name = %name, amount, "reject: short name");
            return LineOutcome::ShortName { consumed };
        }

        tracing::debug!(name = %name, amount, consumed, "accept");
        LineOutcome::Item {
            item: LineItem {
                item_name: name,
                item_quantity: quantity,
                item_rate: rate,
                item_amount: amount,
                confidence: line.avg_confidence,
                origin: Origin::Visual,
            },
            consumed,
        }
    }

    fn continue_name(&self, item: &mut LineItem, line: &Line) {
        let extra = clean_record_noise(&line.text);
        if extra.is_empty() {
            return;
        }
        item.item_name = format!("{} {}", item.item_name, extra).trim().to_string();
        item.confidence = match (item.confidence, line.avg_confidence) {
            (a, b) if a >= 0 && b >= 0 => (a + b) / 2,
            (a, b) => a.max(b),
        };
        tracing::debug!(name = %item.item_name, "continued name");
    }
}

impl ExtractionStrategy for VisualParser<'_> {
    fn name(&self) -> &'static str {
        "visual"
    }

    fn extract(&self, lines: &[Line], amount_column: Option<i32>) -> Vec<LineItem> {
        let mut items: Vec<LineItem> = Vec::new();
        let mut last_item: Option<usize> = None;
        let mut i = 0;

        while i < lines.len() {
            match self.classify(lines, i, amount_column) {
                LineOutcome::Skip => {
                    last_item = None;
                    i += 1;
                }
                LineOutcome::Split(split) => {
                    items.extend(split);
                    last_item = None;
                    i += 1;
                }
                LineOutcome::Item { item, consumed } => {
                    items.push(item);
                    last_item = Some(items.len() - 1);
                    i += consumed;
                }
                LineOutcome::ShortName { consumed } => {
                    last_item = None;
                    i += consumed;
                }
                LineOutcome::NoAmount { consumed } => {
                    let line = &lines[i];
                    match last_item {
                        Some(idx) if line.min_left <= self.config.continuation_max_left => {
                            self.continue_name(&mut items[idx], line);
                        }
                        _ => last_item = None,
                    }
                    i += consumed;
                }
            }
        }

        let total: f64 = items.iter().map(|it| it.item_amount).sum();
        tracing::debug!(count = items.len(), sum = total, "visual pass finished");
        items
    }
}
