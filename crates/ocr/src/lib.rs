pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod source;

pub use pipeline::{BillPipeline, DocumentResult, PipelineConfig, PipelineError};
pub use preprocess::{prepare_page, PreprocessError};
pub use recognizer::{parse_tsv, MockRecognizer, OcrBackend, OcrError, TesseractCli};
pub use source::{DocumentLocator, PageImage, PageSource, SourceError};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
