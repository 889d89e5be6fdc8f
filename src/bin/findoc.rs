//! CLI binary for findoc-ingest.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `IngestConfig` and either serves the HTTP API or runs one document
//! through the pipeline and prints the JSON result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use findoc_ingest::{
    parse_requested_category, server, IngestConfig, Ingestor, ParseRequest,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the HTTP API on port 8000
  findoc serve --port 8000

  # Parse one statement, letting the classifier pick the category
  findoc parse statement.pdf

  # Force a category and keep the OCR transcript in the output
  findoc parse --document-type credit_card --include-raw-text card.png

  # OCR only, no model call
  findoc ocr bill.jpg

ENVIRONMENT VARIABLES:
  SURYA_URL                 OCR service base URL (default http://localhost:8001)
  OLLAMA_URL                Inference service base URL (default http://localhost:11434)
  LLM_MODEL                 Model name (default llama3.1:8b)
  FINDOC_PROMPTS_DIR        Directory of <category>.txt prompt templates
  FINDOC_MAX_CONTEXT_CHARS  Transcript budget in characters (default 10000)
  FINDOC_INFERENCE_RETRIES  Retries on transient inference failures (default 0)
  FINDOC_RETRY_BACKOFF_MS   Base retry backoff, doubled per attempt (default 500)
  RUST_LOG                  Log filter, overrides --verbose
"#;

/// Extract structured financial records from scanned documents.
#[derive(Parser, Debug)]
#[command(
    name = "findoc",
    version,
    about = "Extract structured financial records from scanned documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "FINDOC_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Interface to bind.
        #[arg(long, env = "FINDOC_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to bind.
        #[arg(short, long, env = "FINDOC_PORT", default_value_t = 8000)]
        port: u16,
    },

    /// Run one document through the full pipeline and print the result JSON.
    Parse {
        /// PDF or image file.
        file: PathBuf,

        /// auto, bank_statement, credit_card, bill or loan.
        #[arg(long, default_value = "auto")]
        document_type: String,

        /// Include the OCR transcript in the output.
        #[arg(long)]
        include_raw_text: bool,

        /// Disable the spinner.
        #[arg(long, env = "FINDOC_NO_PROGRESS")]
        no_progress: bool,
    },

    /// OCR a document and report the detected category.
    Ocr {
        /// PDF or image file.
        file: PathBuf,
    },
}

/// Connection and tuning flags shared by every subcommand.
#[derive(Args, Debug)]
struct ServiceArgs {
    /// OCR service base URL.
    #[arg(long, global = true, env = "SURYA_URL")]
    ocr_url: Option<String>,

    /// Inference service base URL.
    #[arg(long, global = true, env = "OLLAMA_URL")]
    inference_url: Option<String>,

    /// Model name passed to the inference service.
    #[arg(long, global = true, env = "LLM_MODEL")]
    model: Option<String>,

    /// Directory of prompt templates (`<category>.txt`).
    #[arg(long, global = true, env = "FINDOC_PROMPTS_DIR")]
    prompts_dir: Option<PathBuf>,

    /// Sampling temperature.
    #[arg(long, global = true, env = "FINDOC_TEMPERATURE")]
    temperature: Option<f32>,

    /// Maximum tokens the model may generate.
    #[arg(long, global = true, env = "FINDOC_MAX_OUTPUT_TOKENS")]
    max_output_tokens: Option<usize>,

    /// Transcript budget in characters.
    #[arg(long, global = true, env = "FINDOC_MAX_CONTEXT_CHARS")]
    max_context_chars: Option<usize>,

    /// OCR request timeout in seconds.
    #[arg(long, global = true, env = "FINDOC_OCR_TIMEOUT")]
    ocr_timeout: Option<u64>,

    /// Total inference timeout in seconds.
    #[arg(long, global = true, env = "FINDOC_INFERENCE_TIMEOUT")]
    inference_timeout: Option<u64>,

    /// Inference connect timeout in seconds.
    #[arg(long, global = true, env = "FINDOC_CONNECT_TIMEOUT")]
    connect_timeout: Option<u64>,

    /// Dependency health probe timeout in seconds.
    #[arg(long, global = true, env = "FINDOC_HEALTH_TIMEOUT")]
    health_timeout: Option<u64>,

    /// Model listing timeout in seconds.
    #[arg(long, global = true, env = "FINDOC_MODELS_TIMEOUT")]
    models_timeout: Option<u64>,

    /// Retries on transient inference failures.
    #[arg(long, global = true, env = "FINDOC_INFERENCE_RETRIES")]
    inference_retries: Option<u32>,

    /// Base retry backoff in milliseconds, doubled on each attempt.
    #[arg(long, global = true, env = "FINDOC_RETRY_BACKOFF_MS")]
    retry_backoff_ms: Option<u64>,

    /// Maximum upload size in bytes.
    #[arg(long, global = true, env = "FINDOC_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.service)?;
    let ingestor = Ingestor::new(config).context("Failed to initialise pipeline")?;

    match cli.command {
        Command::Serve { host, port } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("Invalid bind address {host}:{port}"))?;
            let health = ingestor.health().await;
            if health.all_healthy() {
                eprintln!("{} OCR and inference services reachable", green("✔"));
            } else {
                eprintln!(
                    "{} dependencies not ready: ocr={:?} inference={:?}",
                    red("⚠"),
                    health.ocr,
                    health.inference
                );
            }
            server::serve(ingestor, addr)
                .await
                .context("Server failed")?;
        }
        Command::Parse {
            file,
            document_type,
            include_raw_text,
            no_progress,
        } => {
            let request = ParseRequest {
                category: parse_requested_category(&document_type)?,
                include_raw_text,
            };
            let (bytes, filename) = read_upload(&file).await?;

            let spinner = (!no_progress).then(|| spinner(&filename));
            let outcome = ingestor.parse_document(&bytes, &filename, &request).await;
            if let Some(ref bar) = spinner {
                bar.finish_and_clear();
            }

            let result = outcome.context("Parsing failed")?;
            if result.success {
                eprintln!(
                    "{} {} records from {} ({})",
                    green("✔"),
                    result.record_count(),
                    filename,
                    dim(result.category.as_str())
                );
            } else {
                eprintln!(
                    "{} {}",
                    red("✘"),
                    result.error.as_deref().unwrap_or("normalization failed")
                );
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialise result")?
            );
        }
        Command::Ocr { file } => {
            let (bytes, filename) = read_upload(&file).await?;
            let report = ingestor
                .ocr_only(&bytes, &filename)
                .await
                .context("OCR failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        }
    }

    Ok(())
}

/// Map CLI args to `IngestConfig`; unset flags keep the library defaults.
fn build_config(args: &ServiceArgs) -> Result<IngestConfig> {
    let mut builder = IngestConfig::builder();
    if let Some(ref url) = args.ocr_url {
        builder = builder.ocr_url(url);
    }
    if let Some(ref url) = args.inference_url {
        builder = builder.inference_url(url);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref dir) = args.prompts_dir {
        builder = builder.prompts_dir(dir);
    }
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = args.max_output_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(n) = args.max_context_chars {
        builder = builder.max_context_chars(n);
    }
    if let Some(secs) = args.ocr_timeout {
        builder = builder.ocr_timeout_secs(secs);
    }
    if let Some(secs) = args.inference_timeout {
        builder = builder.inference_timeout_secs(secs);
    }
    if let Some(secs) = args.connect_timeout {
        builder = builder.inference_connect_timeout_secs(secs);
    }
    if let Some(secs) = args.health_timeout {
        builder = builder.health_timeout_secs(secs);
    }
    if let Some(secs) = args.models_timeout {
        builder = builder.models_timeout_secs(secs);
    }
    if let Some(n) = args.inference_retries {
        builder = builder.inference_retries(n);
    }
    if let Some(ms) = args.retry_backoff_ms {
        builder = builder.retry_backoff_ms(ms);
    }
    if let Some(n) = args.max_upload_bytes {
        builder = builder.max_upload_bytes(n);
    }
    builder.build().context("Invalid configuration")
}

async fn read_upload(path: &Path) -> Result<(Vec<u8>, String)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok((bytes, filename))
}

fn spinner(filename: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Parsing");
    bar.set_message(filename.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tuning_flag_reaches_the_config() {
        let cli = Cli::try_parse_from([
            "findoc",
            "--health-timeout",
            "7",
            "--models-timeout",
            "3",
            "--inference-retries",
            "2",
            "--retry-backoff-ms",
            "250",
            "ocr",
            "scan.pdf",
        ])
        .unwrap();

        let config = build_config(&cli.service).unwrap();
        assert_eq!(config.health_timeout_secs, 7);
        assert_eq!(config.models_timeout_secs, 3);
        assert_eq!(config.inference_retries, 2);
        assert_eq!(config.retry_backoff_ms, 250);
    }

    #[test]
    fn zero_health_timeout_is_rejected() {
        let cli = Cli::try_parse_from(["findoc", "--health-timeout", "0", "ocr", "scan.pdf"]).unwrap();
        assert!(build_config(&cli.service).is_err());
    }
}
