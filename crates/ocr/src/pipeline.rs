use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use billsieve_core::{ExtractionResponse, PageResult, ReconciliationResult};
use billsieve_extract::{find_printed_total, reconcile_with_printed_total, PageExtraction, PageExtractor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::preprocess;
use crate::recognizer::OcrBackend;
use crate::source::{DocumentLocator, PageImage, PageSource, SourceError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load document: {0}")]
    Source(#[from] SourceError),
    #[error("Page worker pool closed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rasterization resolution for PDF pages.
    pub dpi: u32,
    /// Pages recognized at the same time.
    pub max_parallel_pages: usize,
    pub scan_printed_total: bool,
    /// Longest side a page image is scaled down to before recognition.
    pub max_image_dimension: u32,
    pub download_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_parallel_pages: std::thread::available_parallelism().map_or(1, |n| n.get()),
            scan_printed_total: true,
            max_image_dimension: 3508,
            download_timeout_secs: 60,
        }
    }
}

/// Pages in page order plus the document-level totals.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResult {
    pub pages: Vec<PageResult>,
    pub reconciliation: ReconciliationResult,
}

impl DocumentResult {
    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.bill_items.len()).sum()
    }

    pub fn into_response(self) -> ExtractionResponse {
        ExtractionResponse::success(self.pages, self.reconciliation)
    }
}

/// Orchestrates: load → per page (preprocess → recognize → extract) → reconcile.
pub struct BillPipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    extractor: Arc<PageExtractor>,
    source: PageSource,
    config: PipelineConfig,
}

impl<R: OcrBackend + 'static> BillPipeline<R> {
    pub fn new(recognizer: R, extractor: PageExtractor, config: PipelineConfig) -> Result<Self, PipelineError> {
        let source = PageSource::new(config.dpi, Duration::from_secs(config.download_timeout_secs))?;
        Ok(Self {
            recognizer: Arc::new(recognizer),
            extractor: Arc::new(extractor),
            source,
            config,
        })
    }

    /// Process one document end to end.
    pub async fn process(&self, locator: &DocumentLocator) -> Result<DocumentResult, PipelineError> {
        let pages = self.source.load(locator).await?;
        tracing::info!(document = %locator, pages = pages.len(), "loaded document");
        self.process_pages(pages).await
    }

    /// Process already-loaded page images. A page that fails to decode or
    /// recognize contributes an empty result instead of failing the document.
    pub async fn process_pages(&self, pages: Vec<PageImage>) -> Result<DocumentResult, PipelineError> {
        let page_numbers: Vec<usize> = pages.iter().map(|p| p.page_no).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_pages.max(1)));
        let mut tasks = JoinSet::new();

        for page in pages {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()))?;
            let recognizer = Arc::clone(&self.recognizer);
            let extractor = Arc::clone(&self.extractor);
            let max_dimension = self.config.max_image_dimension;

            tasks.spawn_blocking(move || {
                let _permit = permit;
                (page.page_no, run_page(recognizer.as_ref(), &extractor, &page, max_dimension))
            });
        }

        let mut done: BTreeMap<usize, PageExtraction> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((page_no, extraction)) => {
                    done.insert(page_no, extraction);
                }
                Err(e) => tracing::warn!(error = %e, "page worker failed"),
            }
        }

        let extractions: Vec<PageExtraction> = page_numbers
            .into_iter()
            .map(|n| {
                done.remove(&n).unwrap_or_else(|| PageExtraction {
                    result: PageResult::empty(n.to_string()),
                    raw_lines: Vec::new(),
                })
            })
            .collect();

        let printed_total = if self.config.scan_printed_total {
            find_printed_total(extractions.iter().map(|e| e.raw_lines.as_slice()))
        } else {
            None
        };

        let pages: Vec<PageResult> = extractions.into_iter().map(|e| e.result).collect();
        let reconciliation = reconcile_with_printed_total(&pages, printed_total);
        let result = DocumentResult { pages, reconciliation };

        tracing::info!(
            pages = result.pages.len(),
            items = result.item_count(),
            reconciled = result.reconciliation.reconciled_amount,
            "document processed"
        );
        Ok(result)
    }
}

fn run_page<R: OcrBackend>(
    recognizer: &R,
    extractor: &PageExtractor,
    page: &PageImage,
    max_dimension: u32,
) -> PageExtraction {
    let page_no = page.page_no.to_string();
    let failed = |page_no: &str| PageExtraction {
        result: PageResult::empty(page_no),
        raw_lines: Vec::new(),
    };

    let png = match preprocess::prepare_page(&page.bytes, max_dimension) {
        Ok(png) => png,
        Err(e) => {
            tracing::warn!(page = %page_no, error = %e, "unreadable page image");
            return failed(&page_no);
        }
    };
    let words = match recognizer.recognize(&png) {
        Ok(words) => words,
        Err(e) => {
            tracing::warn!(page = %page_no, error = %e, "page recognition failed");
            return failed(&page_no);
        }
    };
    tracing::debug!(page = %page_no, words = words.len(), "page recognized");

    extractor.extract_page(&words, &page_no)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
