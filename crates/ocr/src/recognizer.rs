use std::io::Write;
use std::process::{Command, Stdio};

use billsieve_core::Word;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),
    #[error("Malformed TSV at line {line}: {reason}")]
    Tsv { line: usize, reason: String },
}

/// Abstraction over a recognition engine.
/// Implementations accept PNG bytes of one page and return its words with
/// bounding boxes and confidences.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Word>, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a preset word list regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    pub words: Vec<Word>,
}

impl MockRecognizer {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<Vec<Word>, OcrError> {
        Ok(self.words.clone())
    }
}

// ── Tesseract command-line backend ────────────────────────────────────────────

/// Runs the `tesseract` executable, feeding the page on stdin and reading
/// TSV from stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: String,
    lang: Option<String>,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            program: "tesseract".to_string(),
            lang: None,
        }
    }
}

impl TesseractCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    fn args(&self) -> Vec<&str> {
        let mut args = vec!["stdin", "stdout"];
        if let Some(lang) = &self.lang {
            args.extend(["-l", lang.as_str()]);
        }
        args.push("tsv");
        args
    }
}

impl OcrBackend for TesseractCli {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Word>, OcrError> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => OcrError::NotAvailable(self.program.clone()),
                _ => OcrError::Engine(e.to_string()),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image_bytes)
                .map_err(|e| OcrError::Engine(format!("writing image: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!("{} exited with {}: {}", self.program, output.status, stderr.trim())));
        }

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses Tesseract TSV output into word boxes. Only word-level rows
/// (level 5) with non-blank text are kept; a confidence of `-1` is kept as
/// unknown.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Word>, OcrError> {
    let mut words = Vec::new();

    for (idx, row) in tsv.lines().enumerate() {
        let line = idx + 1;
        if row.trim().is_empty() || row.starts_with("level") {
            continue;
        }
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 11 {
            return Err(OcrError::Tsv {
                line,
                reason: format!("expected 12 columns, found {}", fields.len()),
            });
        }
        if fields[0] != "5" {
            continue;
        }
        let text = fields.get(11).map_or("", |t| t.trim());
        if text.is_empty() {
            continue;
        }

        let int = |col: usize| -> Result<i32, OcrError> {
            fields[col].trim().parse::<i32>().map_err(|e| OcrError::Tsv {
                line,
                reason: format!("column {col}: {e}"),
            })
        };
        let confidence = fields[10].trim().parse::<f64>().map_err(|e| OcrError::Tsv {
            line,
            reason: format!("confidence: {e}"),
        })?;

        words.push(Word::new(text, int(6)?, int(7)?, int(8)?, confidence as i32));
    }

    Ok(words)
}

// ── Tesseract library backend (optional, gated behind `tesseract` feature) ────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{parse_tsv, OcrBackend, OcrError};
    use billsieve_core::Word;
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Word>, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::NotAvailable(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let tsv = lt.get_tsv_text(0).map_err(|e| OcrError::Engine(e.to_string()))?;
            parse_tsv(&tsv)
        }
    }
}
