//! Turns a document locator into page images.
//!
//! Local paths, `file://` URIs and http(s) URLs are accepted. PDFs are
//! rasterized with poppler's `pdftoppm`; anything else is treated as a single
//! page image.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to fetch {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF rasterizer failed: {0}")]
    Rasterize(String),
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("Document has no pages: {0}")]
    Empty(String),
}

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocator {
    Path(PathBuf),
    Url(String),
}

impl DocumentLocator {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Self::Url(trimmed.to_string());
        }
        let path = if lower.starts_with("file://") {
            &trimmed["file://".len()..]
        } else {
            trimmed
        };
        Self::Path(PathBuf::from(strip_drive_slash(path)))
    }
}

impl std::fmt::Display for DocumentLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

/// `/C:/bills/a.pdf` → `C:/bills/a.pdf`.
fn strip_drive_slash(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        &path[1..]
    } else {
        path
    }
}

/// Encoded image of one page. Pages are numbered from 1.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_no: usize,
    pub bytes: Vec<u8>,
}

pub struct PageSource {
    dpi: u32,
    client: reqwest::Client,
}

impl PageSource {
    pub fn new(dpi: u32, download_timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(download_timeout)
            .user_agent(concat!("billsieve/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { dpi, client })
    }

    pub async fn load(&self, locator: &DocumentLocator) -> Result<Vec<PageImage>, SourceError> {
        match locator {
            DocumentLocator::Path(path) => self.load_path(path).await,
            DocumentLocator::Url(url) => {
                let download = self.download(url).await?;
                self.load_path(download.path()).await
            }
        }
    }

    async fn download(&self, url: &str) -> Result<tempfile::NamedTempFile, SourceError> {
        let unreachable = |source| SourceError::Unreachable {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(unreachable)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(unreachable)?;
        tracing::info!(url, bytes = body.len(), "downloaded document");

        let suffix = Path::new(url.split(['?', '#']).next().unwrap_or(url))
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new().prefix("billsieve-").suffix(&suffix).tempfile()?;
        std::io::Write::write_all(&mut file, &body)?;
        Ok(file)
    }

    async fn load_path(&self, path: &Path) -> Result<Vec<PageImage>, SourceError> {
        let bytes = tokio::fs::read(path).await?;
        if is_pdf(path, &bytes) {
            let path = path.to_path_buf();
            let dpi = self.dpi;
            let pages = tokio::task::spawn_blocking(move || rasterize_pdf(&path, dpi))
                .await
                .map_err(|e| SourceError::Rasterize(e.to_string()))??;
            tracing::info!(pages = pages.len(), dpi = self.dpi, "rasterized PDF");
            return Ok(pages);
        }

        if image::guess_format(&bytes).is_err() {
            return Err(SourceError::UnsupportedFormat(path.display().to_string()));
        }
        Ok(vec![PageImage { page_no: 1, bytes }])
    }
}

fn is_pdf(path: &Path, bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Runs `pdftoppm -r <dpi> -png` into a scratch directory and reads the
/// pages back in page order.
fn rasterize_pdf(pdf: &Path, dpi: u32) -> Result<Vec<PageImage>, SourceError> {
    let scratch = tempfile::tempdir()?;
    let prefix = scratch.path().join("page");

    let output = Command::new("pdftoppm")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-png")
        .arg(pdf)
        .arg(&prefix)
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::Rasterize("pdftoppm not found on PATH".to_string()),
            _ => SourceError::Io(e),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::Rasterize(stderr.trim().to_string()));
    }

    let mut rendered: Vec<(usize, PathBuf)> = std::fs::read_dir(scratch.path())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|p| rendered_page_number(&p).map(|n| (n, p)))
        .collect();
    rendered.sort_by_key(|(n, _)| *n);

    if rendered.is_empty() {
        return Err(SourceError::Empty(pdf.display().to_string()));
    }

    rendered
        .into_iter()
        .enumerate()
        .map(|(idx, (_, p))| -> Result<PageImage, SourceError> {
            Ok(PageImage {
                page_no: idx + 1,
                bytes: std::fs::read(p)?,
            })
        })
        .collect()
}

/// `page-07.png` → 7. pdftoppm zero-pads to the width of the page count.
fn rendered_page_number(path: &Path) -> Option<usize> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}
