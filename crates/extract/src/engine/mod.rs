//! Line-item extraction: turns a page's filtered lines into candidate items.
//!
//! Two strategies share one contract. The visual parser runs on every page;
//! the structured-record parser joins it when enough lines look like a
//! serialized record (a JSON response pasted into a document, say).

mod structured;
mod visual;

pub use structured::StructuredRecordParser;
pub use visual::VisualParser;

use billsieve_core::{Line, LineItem};

use crate::config::ExtractionConfig;
use crate::rules::{RuleAction, RuleSet};

/// One way of reading items out of a page.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;

    /// `amount_column` is the estimated x of printed amounts, if any.
    fn extract(&self, lines: &[Line], amount_column: Option<i32>) -> Vec<LineItem>;
}

pub struct LineItemExtractor<'a> {
    rules: &'a RuleSet,
    config: &'a ExtractionConfig,
}

impl<'a> LineItemExtractor<'a> {
    pub fn new(rules: &'a RuleSet, config: &'a ExtractionConfig) -> Self {
        Self { rules, config }
    }

    /// Number of lines shaped like a serialized record.
    pub fn structured_line_count(&self, lines: &[Line]) -> usize {
        lines
            .iter()
            .filter(|l| self.rules.matches(RuleAction::StructuredRecord, &l.text))
            .count()
    }

    pub fn is_structured_page(&self, lines: &[Line]) -> bool {
        self.structured_line_count(lines) >= (lines.len() / 6).max(3)
    }

    /// Strategies to run for this page, in output order.
    pub fn strategies(&self, lines: &[Line]) -> Vec<Box<dyn ExtractionStrategy + 'a>> {
        let mut strategies: Vec<Box<dyn ExtractionStrategy + 'a>> = Vec::new();
        if self.is_structured_page(lines) {
            strategies.push(Box::new(StructuredRecordParser::new(self.config)));
        }
        strategies.push(Box::new(VisualParser::new(self.rules, self.config)));
        strategies
    }

    pub fn extract(&self, lines: &[Line], amount_column: Option<i32>) -> Vec<LineItem> {
        self.strategies(lines)
            .iter()
            .flat_map(|strategy| {
                let items = strategy.extract(lines, amount_column);
                tracing::debug!(strategy = strategy.name(), count = items.len(), "strategy finished");
                items
            })
            .collect()
    }
}
