use std::collections::HashSet;

use billsieve_core::{Line, Money, PageResult, ReconciliationResult};

use crate::text::{numeric_tokens, parse_money};

/// Sums the distinct items of all pages. No printed-total check.
pub fn reconcile(pages: &[PageResult]) -> ReconciliationResult {
    reconcile_with_printed_total(pages, None)
}

/// Sums the distinct items of all pages and, when a printed total is known,
/// attaches a note if the two disagree by more than `max(1.0, 1%)`.
///
/// Items are distinct on `(normalized name, amount to the cent)`; the sum is
/// taken over those keys, so page order never changes the result.
pub fn reconcile_with_printed_total(
    pages: &[PageResult],
    printed_total: Option<f64>,
) -> ReconciliationResult {
    let mut seen: HashSet<(String, Money)> = HashSet::new();
    let reconciled: Money = pages
        .iter()
        .flat_map(|p| p.bill_items.iter())
        .filter_map(|it| Some((normalize_name(&it.item_name), Money::from_f64(it.item_amount)?)))
        .filter(|key| seen.insert(key.clone()))
        .map(|(_, amount)| amount)
        .sum();

    let reconciled_amount = reconciled.to_f64();
    let note = printed_total.and_then(|printed| {
        let diff = (Money::from_f64(printed)? - reconciled).abs();
        let allowed = Money::from_f64(0.01 * printed)
            .unwrap_or_else(Money::zero)
            .max(Money::from_cents(100));
        (diff > allowed).then(|| {
            tracing::warn!(printed, extracted = reconciled_amount, "printed total mismatch");
            format!("printed_total_mismatch (printed={printed:.2}, extracted={reconciled_amount:.2})")
        })
    });

    tracing::info!(
        items = seen.len(),
        reconciled = %reconciled,
        printed = ?printed_total,
        "reconciled document"
    );

    ReconciliationResult {
        reconciled_amount,
        printed_total,
        note,
    }
}

/// Scans recognized lines page by page for a total-like line and returns the
/// last number on the last such line of the document.
pub fn find_printed_total<'a, I>(pages: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a [Line]>,
{
    pages
        .into_iter()
        .flat_map(|lines| lines.iter())
        .filter(|line| {
            let low = line.text.to_lowercase();
            low.contains("total") || low.contains("amount")
        })
        .filter_map(|line| numeric_tokens(&line.text).last().map(|tok| parse_money(tok)))
        .last()
}

/// Lowercased, alphanumerics and whitespace only, trimmed.
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean_page_items;
    use crate::config::ExtractionConfig;
    use crate::rules::RuleSet;
    use billsieve_core::{LineItem, Origin, Word};

    fn item(name: &str, amount: f64) -> LineItem {
        LineItem {
            item_name: name.to_string(),
            item_quantity: 0.0,
            item_rate: 0.0,
            item_amount: amount,
            confidence: 90,
            origin: Origin::Visual,
        }
    }

    fn page(no: &str, items: Vec<LineItem>) -> PageResult {
        PageResult::new(no, items, vec![])
    }

    fn text_line(text: &str) -> Line {
        Line {
            text: text.to_string(),
            avg_confidence: 90,
            min_left: 50,
            max_right: 500,
            words: vec![Word::new(text, 50, 0, 450, 90)],
        }
    }

    #[test]
    fn sums_items_across_pages() {
        let pages = vec![
            page("1", vec![item("Widget", 30.0), item("Gadget", 20.0)]),
            page("2", vec![item("Cable", 50.0)]),
        ];
        let r = reconcile(&pages);
        assert_eq!(r.reconciled_amount, 100.0);
        assert!(r.printed_total.is_none());
        assert!(r.note.is_none());
    }

    #[test]
    fn dedupes_same_item_on_two_pages() {
        let pages = vec![
            page("1", vec![item("Widget A", 30.0)]),
            page("2", vec![item("widget a!", 30.0), item("Widget A", 31.0)]),
        ];
        assert_eq!(reconcile(&pages).reconciled_amount, 61.0);
    }

    #[test]
    fn page_order_does_not_change_total() {
        let a = page("1", vec![item("Widget", 10.004), item("Gadget", 2.5)]);
        let b = page("2", vec![item("Widget", 10.0), item("Cable", 0.1)]);
        let c = page("3", vec![item("Cable", 0.1), item("Fuse", 0.2)]);
        let forward = reconcile(&[a.clone(), b.clone(), c.clone()]).reconciled_amount;
        let backward = reconcile(&[c.clone(), b.clone(), a.clone()]).reconciled_amount;
        let shuffled = reconcile(&[b, c, a]).reconciled_amount;
        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
        assert_eq!(forward, 12.8);
    }

    #[test]
    fn blacklisted_item_on_two_pages_contributes_nothing() {
        let rules = RuleSet::builtin();
        let config = ExtractionConfig::default();
        let pages: Vec<PageResult> = ["1", "2"]
            .iter()
            .map(|no| page(no, clean_page_items(vec![item("Tax", 5.0)], &rules, &config)))
            .collect();
        assert_eq!(reconcile(&pages).reconciled_amount, 0.0);
    }

    #[test]
    fn printed_total_mismatch_adds_note() {
        let pages = vec![page("1", vec![item("Widget", 60.0), item("Gadget", 40.0)])];
        let printed = find_printed_total([vec![text_line("Grand Total 150.00")].as_slice()]);
        let r = reconcile_with_printed_total(&pages, printed);
        assert_eq!(r.reconciled_amount, 100.0);
        assert_eq!(r.printed_total, Some(150.0));
        let note = r.note.unwrap();
        assert!(note.contains("150.00"));
        assert!(note.contains("100.00"));
    }

    #[test]
    fn small_difference_is_tolerated() {
        let pages = vec![page("1", vec![item("Widget", 99.5)])];
        let r = reconcile_with_printed_total(&pages, Some(100.0));
        assert!(r.note.is_none());

        // 1% of 1000 is 10.
        let pages = vec![page("1", vec![item("Widget", 991.0)])];
        assert!(reconcile_with_printed_total(&pages, Some(1000.0)).note.is_none());
        let pages = vec![page("1", vec![item("Widget", 989.0)])];
        assert!(reconcile_with_printed_total(&pages, Some(1000.0)).note.is_some());
    }

    #[test]
    fn difference_of_exactly_one_is_tolerated() {
        let pages = vec![page(
            "1",
            vec![item("Widget", 33.33), item("Gadget", 33.33), item("Cable", 32.34)],
        )];
        let r = reconcile_with_printed_total(&pages, Some(100.0));
        assert_eq!(r.reconciled_amount, 99.0);
        assert!(r.note.is_none());

        let r = reconcile_with_printed_total(&pages, Some(100.01));
        assert!(r.note.unwrap().contains("printed=100.01"));
    }

    #[test]
    fn printed_total_takes_last_candidate_across_pages() {
        let first = vec![text_line("Sub Total 90.00"), text_line("Widget 90.00")];
        let second = vec![text_line("Net Amount Payable 1,250.50"), text_line("Thank you")];
        let total = find_printed_total([first.as_slice(), second.as_slice()]);
        assert_eq!(total, Some(1250.5));
    }

    #[test]
    fn printed_total_ignores_lines_without_numbers() {
        let lines = vec![text_line("Total 40.00"), text_line("Total amount in words")];
        assert_eq!(find_printed_total([lines.as_slice()]), Some(40.0));
        assert_eq!(find_printed_total(Vec::<&[Line]>::new()), None);
    }

    #[test]
    fn normalize_name_keeps_words() {
        assert_eq!(normalize_name("  Widget-A (Blue) "), "widgeta blue");
    }
}
