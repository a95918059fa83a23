use serde::{Deserialize, Serialize};

/// Thresholds and tolerances used while turning words into line items.
/// Geometry is in recognition-engine pixels (300 DPI pages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Words scored below this are dropped before rows are built.
    pub row_min_confidence: i32,
    /// Lines averaging below this are not considered for items.
    pub line_min_confidence: i32,
    /// Max vertical distance from a row's first word.
    pub line_tolerance: i32,
    /// Max horizontal distance between a price and the amount column.
    pub amount_tolerance: i32,
    /// Lines starting right of this are never name continuations.
    pub continuation_max_left: i32,
    /// Lines scanned after an item-name key for its companion fields.
    pub structured_window: usize,
    pub min_name_alpha: usize,
    /// Name characters that take part in the page dedup key.
    pub dedupe_name_prefix: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            row_min_confidence: 10,
            line_min_confidence: 40,
            line_tolerance: 10,
            amount_tolerance: 55,
            continuation_max_left: 300,
            structured_window: 7,
            min_name_alpha: 3,
            dedupe_name_prefix: 14,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_content: &str) -> Result<ExtractionConfig, toml::de::Error> {
        toml::from_str(toml_content)
    }

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(parse("").unwrap(), ExtractionConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = parse("amount_tolerance = 80\n").unwrap();
        assert_eq!(cfg.amount_tolerance, 80);
        assert_eq!(cfg.line_tolerance, 10);
        assert_eq!(cfg.continuation_max_left, 300);
    }

    #[test]
    fn bad_type_is_rejected() {
        assert!(parse("amount_tolerance = \"wide\"\n").is_err());
    }
}
