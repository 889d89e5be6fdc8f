//! # findoc-ingest
//!
//! Turn scanned financial documents into structured records using OCR and
//! a locally hosted language model.
//!
//! ## Why this crate?
//!
//! Bank statements, card statements, utility bills and loan statements all
//! carry the same handful of facts (amounts, dates, counterparties), but no
//! two issuers lay them out alike. Instead of per-issuer parsers this crate
//! reads the document with an OCR service, asks a model to answer with JSON
//! in a category-specific shape, and then coerces whatever comes back into
//! strictly typed [`Transaction`], [`Bill`] and [`Debt`] records.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF / image bytes)
//!  │
//!  ├─ 1. OCR        POST to the OCR service → transcript
//!  ├─ 2. Classify   keyword rules → DocumentCategory (unless given)
//!  ├─ 3. Prompt     category template + transcript truncated to budget
//!  ├─ 4. Inference  streamed NDJSON completion from the model service
//!  ├─ 5. Extract    fenced block → whole text → {…} span → […] span
//!  └─ 6. Normalize  payload → Transaction / Bill / Debt records
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use findoc_ingest::{IngestConfig, Ingestor, ParseRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig::builder()
//!         .inference_url("http://localhost:11434")
//!         .model("llama3.1:8b")
//!         .build()?;
//!     let ingestor = Ingestor::new(config)?;
//!
//!     let bytes = std::fs::read("statement.pdf")?;
//!     let result = ingestor
//!         .parse_document(&bytes, "statement.pdf", &ParseRequest::default())
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `findoc` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library:
//! ```toml
//! findoc-ingest = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod category;
pub mod config;
pub mod error;
pub mod health;
pub mod ingest;
pub mod pipeline;
pub mod prompts;
pub mod records;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use category::{parse_requested_category, DocumentCategory, UnknownCategory};
pub use config::{IngestConfig, IngestConfigBuilder};
pub use error::{ErrorClass, IngestError, NormalizationError};
pub use health::{DependencyStatus, HealthReport};
pub use ingest::{Ingestor, ParseRequest};
pub use pipeline::inference::{InferenceEngine, OllamaClient};
pub use pipeline::ocr::{SuryaOcrClient, TextExtractor};
pub use prompts::PromptLibrary;
pub use records::{
    Bill, Debt, NormalizedResult, OcrReport, SyncStatus, Transaction, TransactionKind,
};
