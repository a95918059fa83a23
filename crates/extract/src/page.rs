use billsieve_core::{Line, PageResult, Word};

use crate::clean::clean_page_items;
use crate::column::estimate_amount_column;
use crate::config::ExtractionConfig;
use crate::engine::LineItemExtractor;
use crate::filter::filter_noise_lines;
use crate::rows::build_lines;
use crate::rules::RuleSet;

/// Output of one page: the result to report plus the unfiltered rows, kept
/// for the printed-total scan.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub result: PageResult,
    pub raw_lines: Vec<Line>,
}

/// Runs the per-page stages in order: rows, noise filter, amount column,
/// strategies, cleaner.
#[derive(Debug, Clone, Default)]
pub struct PageExtractor {
    rules: RuleSet,
    config: ExtractionConfig,
}

impl PageExtractor {
    pub fn new(rules: RuleSet, config: ExtractionConfig) -> Self {
        Self { rules, config }
    }

    pub fn extract_page(&self, words: &[Word], page_no: &str) -> PageExtraction {
        let raw_lines = build_lines(words, self.config.row_min_confidence, self.config.line_tolerance);
        if raw_lines.is_empty() {
            tracing::debug!(page = page_no, "no rows on page");
            return PageExtraction {
                result: PageResult::empty(page_no),
                raw_lines,
            };
        }

        let lines = filter_noise_lines(raw_lines.clone(), &self.rules);
        let column = estimate_amount_column(&lines);
        let candidates = LineItemExtractor::new(&self.rules, &self.config).extract(&lines, column);
        let candidate_count = candidates.len();
        let items = clean_page_items(candidates, &self.rules, &self.config);

        tracing::info!(
            page = page_no,
            rows = raw_lines.len(),
            kept_rows = lines.len(),
            amount_column = ?column,
            candidates = candidate_count,
            items = items.len(),
            "page extracted"
        );

        PageExtraction {
            result: PageResult::new(page_no, items, lines),
            raw_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billsieve_core::Origin;

    /// Words for one printed row; each part is `(text, left)`.
    fn row(parts: &[(&str, i32)], top: i32, confidence: i32) -> Vec<Word> {
        parts
            .iter()
            .map(|(text, left)| Word::new(*text, *left, top, 10 * text.chars().count() as i32, confidence))
            .collect()
    }

    #[test]
    fn empty_page_yields_empty_result() {
        let out = PageExtractor::default().extract_page(&[], "1");
        assert_eq!(out.result, PageResult::empty("1"));
        assert!(out.raw_lines.is_empty());
    }

    #[test]
    fn tabular_page_end_to_end() {
        let mut words = Vec::new();
        words.extend(row(&[("Sample", 50), ("Document", 130), ("1", 230)], 20, 95));
        words.extend(row(&[("Description", 50), ("Qty", 300), ("Rate", 400), ("Amount", 480)], 60, 95));
        words.extend(row(&[("Widget", 50), ("A", 120), ("2", 300), ("15.00", 400), ("30.00", 480)], 100, 91));
        words.extend(row(&[("Gadget", 50), ("Blue", 120), ("1", 300), ("20.00", 400), ("20.00", 480)], 140, 89));
        words.extend(row(&[("Consultation", 50), ("500.00", 480)], 160, 92));
        words.extend(row(&[("Sub", 50), ("Total", 90), ("550.00", 480)], 180, 93));
        // Same row, slightly lower on the scan; joins the first word's line.
        words.extend(row(&[("Page", 50)], 300, 95));
        words.extend(row(&[("1", 100)], 306, 95));

        let out = PageExtractor::default().extract_page(&words, "1");
        let names: Vec<&str> = out.result.bill_items.iter().map(|i| i.item_name.as_str()).collect();
        assert_eq!(names, vec!["Widget A", "Gadget Blue", "Consultation"]);

        let widget = &out.result.bill_items[0];
        assert_eq!(widget.item_amount, 30.0);
        assert_eq!(widget.item_rate, 15.0);
        assert_eq!(widget.item_quantity, 2.0);
        assert_eq!(widget.origin, Origin::SplitLine);
        assert_eq!(out.result.bill_items[2].origin, Origin::Visual);

        assert_eq!(out.raw_lines.len(), 7);
        assert!(out.raw_lines.iter().any(|l| l.text == "Sub Total 550.00"));
        assert!(out.result.lines.iter().all(|l| !l.text.starts_with("Sample")));
        assert_eq!(out.result.page_type, billsieve_core::PageType::BillDetail);
    }

    #[test]
    fn low_confidence_words_never_reach_rows() {
        let mut words = row(&[("Widget", 50), ("30.00", 480)], 100, 90);
        words.push(Word::new("zzz", 250, 100, 30, 3));
        let out = PageExtractor::default().extract_page(&words, "2");
        assert_eq!(out.raw_lines.len(), 1);
        assert_eq!(out.raw_lines[0].text, "Widget 30.00");
        assert_eq!(out.result.bill_items.len(), 1);
        assert_eq!(out.result.page_no, "2");
    }

    #[test]
    fn duplicate_rows_on_page_collapse() {
        let mut words = Vec::new();
        words.extend(row(&[("Gauze", 50), ("Roll", 110), ("20.00", 480)], 100, 90));
        words.extend(row(&[("Gauze", 50), ("Roll", 110), ("20.00", 480)], 140, 90));
        let out = PageExtractor::default().extract_page(&words, "1");
        assert_eq!(out.result.bill_items.len(), 1);
    }

    #[test]
    fn tax_breakdown_and_totals_are_not_items() {
        let mut words = Vec::new();
        words.extend(row(&[("Consultation", 50), ("500.00", 480)], 100, 92));
        words.extend(row(&[("Taxable", 50), ("Amount", 130), ("500.00", 480)], 140, 92));
        words.extend(row(&[("CGST", 50), ("45.00", 480)], 180, 92));
        words.extend(row(&[("SGST", 50), ("45.00", 480)], 220, 92));
        words.extend(row(&[("Totals", 50), ("590.00", 480)], 260, 92));

        let out = PageExtractor::default().extract_page(&words, "1");
        let names: Vec<&str> = out.result.bill_items.iter().map(|i| i.item_name.as_str()).collect();
        assert_eq!(names, vec!["Consultation"]);
        assert_eq!(out.result.bill_items[0].item_amount, 500.0);
        assert_eq!(crate::reconcile::reconcile(&[out.result]).reconciled_amount, 500.0);
    }
}
