//! `billsieve` - extract bill line items from scanned documents

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use billsieve_core::ErrorResponse;
use billsieve_ocr::{BillPipeline, DocumentLocator, OcrBackend};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "billsieve")]
#[command(about = "Extract line items and reconciled totals from bill scans")]
#[command(version)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process documents and print one JSON envelope per document
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local paths, file:// URIs or http(s) URLs (PDF or image)
    #[arg(required = true)]
    locators: Vec<String>,

    /// TOML file with [extraction] and [pipeline] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print JSON instead of one line per document
    #[arg(long)]
    pretty: bool,

    /// PDF rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Skip the printed-total cross-check
    #[arg(long)]
    no_printed_total: bool,

    /// Recognition language(s), e.g. "eng" or "eng+hin"
    #[arg(short, long)]
    lang: Option<String>,

    /// tessdata directory for the in-process engine
    #[cfg(feature = "tesseract")]
    #[arg(long)]
    tessdata: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Extract(args) => extract(args).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            // Setup failed before any document ran.
            tracing::error!(error = %format!("{err:#}"), "setup failed");
            if let Err(write_err) = emit(&error_payload(&err), false) {
                tracing::error!(error = %write_err, "failed to write error payload");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn extract(args: ExtractArgs) -> Result<ExitCode> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(dpi) = args.dpi {
        config.pipeline.dpi = dpi;
    }
    if args.no_printed_total {
        config.pipeline.scan_printed_total = false;
    }

    let extractor = config.page_extractor()?;

    #[cfg(feature = "tesseract")]
    let recognizer = billsieve_ocr::TesseractRecognizer::new(
        args.tessdata.clone(),
        args.lang.as_deref().unwrap_or("eng"),
    );
    #[cfg(not(feature = "tesseract"))]
    let recognizer = match &args.lang {
        Some(lang) => billsieve_ocr::TesseractCli::new().with_lang(lang),
        None => billsieve_ocr::TesseractCli::new(),
    };

    let pipeline = BillPipeline::new(recognizer, extractor, config.pipeline.clone())
        .context("building pipeline")?;
    let failures = run_documents(&pipeline, &args.locators, args.pretty).await?;
    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Processes every locator in turn and returns how many failed. A failed
/// document prints the error payload; the rest still run.
async fn run_documents<R: OcrBackend + 'static>(
    pipeline: &BillPipeline<R>,
    locators: &[String],
    pretty: bool,
) -> Result<usize> {
    let mut failures = 0usize;

    for raw in locators {
        let locator = DocumentLocator::parse(raw);
        match pipeline.process(&locator).await {
            Ok(result) => emit(&result.into_response(), pretty)?,
            Err(e) => {
                failures += 1;
                let err = anyhow::Error::new(e).context(format!("processing {locator}"));
                tracing::error!(document = %locator, error = %format!("{err:#}"), "document failed");
                emit(&error_payload(&err), pretty)?;
            }
        }
    }

    tracing::info!(documents = locators.len(), failures, "done");
    Ok(failures)
}

fn error_payload(err: &anyhow::Error) -> ErrorResponse {
    ErrorResponse {
        error: format!("{err:#}"),
        trace: format!("{err:?}"),
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    write_json(&mut std::io::stdout().lock(), value, pretty)
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{json}").context("writing output")?;
    out.flush().context("writing output")?;
    Ok(())
}
