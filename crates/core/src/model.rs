use serde::{Deserialize, Serialize};

/// One recognized token as produced by the recognition engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub left: i32,
    pub right: i32,
    pub top: i32,
    /// 0–100, or -1 when the engine did not score the token.
    pub confidence: i32,
}

impl Word {
    pub fn new(text: impl Into<String>, left: i32, top: i32, width: i32, confidence: i32) -> Self {
        Self {
            text: text.into(),
            left,
            right: left + width.max(0),
            top,
            confidence,
        }
    }

    pub fn has_known_confidence(&self) -> bool {
        self.confidence >= 0
    }
}

/// Words sharing a baseline, ordered left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    /// Integer mean of the scored words, -1 if none were scored.
    pub avg_confidence: i32,
    pub min_left: i32,
    pub max_right: i32,
    pub words: Vec<Word>,
}

impl Line {
    /// The word furthest right, which is where amounts are printed.
    pub fn rightmost(&self) -> Option<&Word> {
        self.words.last()
    }
}

/// Which extraction strategy produced a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Visual,
    SplitLine,
    JsonMode,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Visual => write!(f, "visual"),
            Origin::SplitLine => write!(f, "split_line"),
            Origin::JsonMode => write!(f, "json_mode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_name: String,
    pub item_quantity: f64,
    pub item_rate: f64,
    pub item_amount: f64,
    pub confidence: i32,
    pub origin: Origin,
}

impl LineItem {
    /// Number of alphabetic characters in the name.
    pub fn name_alpha_count(&self) -> usize {
        alpha_count(&self.item_name)
    }
}

pub fn alpha_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphabetic()).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageType {
    #[default]
    #[serde(rename = "Bill Detail")]
    BillDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_no: String,
    pub page_type: PageType,
    pub bill_items: Vec<LineItem>,
    pub lines: Vec<Line>,
}

impl PageResult {
    pub fn new(page_no: impl Into<String>, bill_items: Vec<LineItem>, lines: Vec<Line>) -> Self {
        Self {
            page_no: page_no.into(),
            page_type: PageType::BillDetail,
            bill_items,
            lines,
        }
    }

    /// A page that contributed nothing, e.g. because recognition failed.
    pub fn empty(page_no: impl Into<String>) -> Self {
        Self::new(page_no, vec![], vec![])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub reconciled_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printed_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
