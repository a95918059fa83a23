pub mod clean;
pub mod column;
pub mod config;
pub mod engine;
pub mod filter;
pub mod page;
pub mod reconcile;
pub mod rows;
pub mod rules;
pub(crate) mod text;

pub use clean::clean_page_items;
pub use column::estimate_amount_column;
pub use config::ExtractionConfig;
pub use engine::{ExtractionStrategy, LineItemExtractor, StructuredRecordParser, VisualParser};
pub use filter::filter_noise_lines;
pub use page::{PageExtraction, PageExtractor};
pub use reconcile::{find_printed_total, reconcile, reconcile_with_printed_total};
pub use rows::build_lines;
pub use rules::{MatchType, PatternRule, RuleAction, RuleSet, RulesError};
