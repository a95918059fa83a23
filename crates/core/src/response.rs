use serde::{Deserialize, Serialize};

use crate::model::{PageResult, ReconciliationResult};

/// Token accounting placeholder; extraction never calls a language model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub pagewise_line_items: Vec<PageResult>,
    pub total_item_count: usize,
    #[serde(flatten)]
    pub totals: ReconciliationResult,
}

/// Envelope returned for a successfully processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub is_success: bool,
    pub token_usage: TokenUsage,
    pub data: ResponseData,
}

impl ExtractionResponse {
    pub fn success(pages: Vec<PageResult>, totals: ReconciliationResult) -> Self {
        let total_item_count = pages.iter().map(|p| p.bill_items.len()).sum();
        Self {
            is_success: true,
            token_usage: TokenUsage::default(),
            data: ResponseData {
                pagewise_line_items: pages,
                total_item_count,
                totals,
            },
        }
    }
}

/// Diagnostic payload for a document that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub trace: String,
}
