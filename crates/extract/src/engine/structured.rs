use billsieve_core::model::alpha_count;
use billsieve_core::{Line, LineItem, Origin};

use super::ExtractionStrategy;
use crate::config::ExtractionConfig;
use crate::text::{clean_record_noise, parse_candidate_amount, re};

re!(re_name_key, r#"(?i)"?item[ _]?name"?\s*[:=]"#);
// Quoted value, or everything up to the next comma or closing brace.
re!(re_key_value, r#"[:=]\s*(?:"([^"]*)"|'([^']*)'|([^,}]*))"#);
re!(re_amount_key, r#"(?i)"?item[ _]?amount"?\s*[:=]\s*([0-9.,]+)"#);
re!(re_rate_key, r#"(?i)"?item[ _]?rate"?\s*[:=]\s*([0-9.,]+)"#);
re!(re_quantity_key, r#"(?i)"?item[ _]?quantity"?\s*[:=]\s*([0-9.,]+)"#);
re!(re_bare_number, r"^[\s₹$€£]*([0-9.,]+)\s*,?$");

/// Reads items printed as key/value records, e.g. a JSON payload that ended
/// up on the page: `"item_name": "X"` followed within a few lines by
/// `"item_amount": 12.5` (or a bare number).
pub struct StructuredRecordParser<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> StructuredRecordParser<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    fn name_value(texts: &[&str], idx: usize) -> Option<String> {
        let inline = re_key_value()
            .captures(texts[idx])
            .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
            .map(|m| clean_name(m.as_str()))
            .filter(|v| !v.is_empty());
        inline.or_else(|| {
            texts
                .get(idx + 1)
                .map(|t| clean_name(t))
                .filter(|v| !v.is_empty())
        })
    }

    fn record_at(&self, lines: &[Line], texts: &[&str], idx: usize) -> Option<LineItem> {
        let name = Self::name_value(texts, idx)?;

        let mut amount: Option<f64> = None;
        let mut rate = 0.0;
        let mut quantity = 0.0;
        let end = (idx + self.config.structured_window).min(texts.len());

        for (j, text) in texts.iter().enumerate().take(end).skip(idx) {
            if j > idx && re_name_key().is_match(text) {
                break;
            }
            if let Some(c) = re_amount_key().captures(text) {
                amount = Some(parse_candidate_amount(&c[1]));
            } else if amount.is_none() {
                if let Some(c) = re_bare_number().captures(text) {
                    amount = Some(parse_candidate_amount(&c[1]));
                }
            }
            if let Some(c) = re_rate_key().captures(text) {
                rate = parse_candidate_amount(&c[1]);
            }
            if let Some(c) = re_quantity_key().captures(text) {
                quantity = parse_candidate_amount(&c[1]);
            }
        }

        let amount = amount.filter(|a| *a > 0.0)?;
        if alpha_count(&name) < self.config.min_name_alpha {
            tracing::debug!(name = %name, "record name lacks letters");
            return None;
        }
        tracing::debug!(name = %name, amount, "accept record");
        Some(LineItem {
            item_name: name,
            item_quantity: quantity,
            item_rate: rate,
            item_amount: amount,
            confidence: lines[idx].avg_confidence,
            origin: Origin::JsonMode,
        })
    }
}

fn clean_name(raw: &str) -> String {
    clean_record_noise(raw)
        .trim_end_matches([',', ':', ';'])
        .trim()
        .to_string()
}

impl ExtractionStrategy for StructuredRecordParser<'_> {
    fn name(&self) -> &'static str {
        "structured_record"
    }

    fn extract(&self, lines: &[Line], _amount_column: Option<i32>) -> Vec<LineItem> {
        let texts: Vec<&str> = lines.iter().map(|l| l.text.trim()).collect();
        texts
            .iter()
            .enumerate()
            .filter(|(_, t)| re_name_key().is_match(t))
            .filter_map(|(idx, _)| self.record_at(lines, &texts, idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::line;

    fn run(texts: &[&str]) -> Vec<LineItem> {
        let config = ExtractionConfig::default();
        let lines: Vec<Line> = texts.iter().map(|t| line(t)).collect();
        StructuredRecordParser::new(&config).extract(&lines, None)
    }

    #[test]
    fn record_with_companion_keys() {
        let items = run(&[
            r#""item_name": "Blood Test","#,
            r#""item_quantity": 2,"#,
            r#""item_rate": 225.00,"#,
            r#""item_amount": 450.00"#,
        ]);
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.item_name, "Blood Test");
        assert_eq!(it.item_quantity, 2.0);
        assert_eq!(it.item_rate, 225.0);
        assert_eq!(it.item_amount, 450.0);
        assert_eq!(it.origin, Origin::JsonMode);
    }

    #[test]
    fn name_on_following_line() {
        let items = run(&["item name:", "Ultrasound Abdomen", "1,800.00"]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_name, "Ultrasound Abdomen");
        assert_eq!(items[0].item_amount, 1800.0);
    }

    #[test]
    fn bare_number_is_amount_only_once() {
        let items = run(&[r#""item_name": "Syringe","#, "12.00", "99.00"]);
        assert_eq!(items[0].item_amount, 12.0);
    }

    #[test]
    fn record_without_amount_is_dropped() {
        assert!(run(&[r#""item_name": "Syringe","#, r#""item_rate": 3.00"#]).is_empty());
    }

    #[test]
    fn window_stops_at_next_record() {
        let items = run(&[
            r#""item_name": "Gauze","#,
            r#""item_name": "Syringe","#,
            r#""item_amount": 15.00"#,
        ]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_name, "Syringe");
    }

    #[test]
    fn single_line_record() {
        let items = run(&[r#"{"item_name": "Dressing", "item_amount": 120.5, "item_rate": 120.5, "item_quantity": 1}"#]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_amount, 120.5);
        assert_eq!(items[0].item_quantity, 1.0);
    }

    #[test]
    fn window_is_bounded() {
        let mut texts = vec![r#""item_name": "Gauze","#];
        texts.extend(std::iter::repeat("padding line").take(7));
        texts.push(r#""item_amount": 15.00"#);
        assert!(run(&texts).is_empty());
    }
}
