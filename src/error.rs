//! Error types for the findoc-ingest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IngestError`] (**fatal**): the request cannot produce records at all
//!   (OCR service down, blank scan, model output with no JSON in it).
//!   Returned as `Err(IngestError)` from [`crate::ingest::Ingestor`].
//!
//! * [`NormalizationError`] (**non-fatal**): the model produced a payload
//!   but it could not be mapped onto typed records. Stored inside
//!   [`crate::records::NormalizedResult`] as `success = false` so the caller
//!   still gets a well-formed response.
//!
//! Only the orchestrator converts between the two; no stage decides on its
//! own whether a failure is terminal.

use thiserror::Error;

/// Maximum number of characters of model output kept in a
/// [`IngestError::JsonExtraction`] for diagnostics.
pub const DIAGNOSTIC_PREVIEW_CHARS: usize = 500;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The uploaded document itself is unusable (400).
    ClientInput,
    /// A dependency is down, erroring or too slow (502).
    Upstream,
    /// Configuration defect or unusable model output (500).
    Internal,
}

/// All fatal errors returned by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR service answered with a non-success status.
    #[error("OCR service error ({status}): {body}")]
    OcrService { status: u16, body: String },

    /// The OCR service could not be reached or its reply was unreadable.
    #[error("OCR service unreachable at '{url}': {reason}")]
    OcrUnreachable { url: String, reason: String },

    /// OCR succeeded but produced no usable text.
    #[error("No text extracted from document")]
    EmptyTranscript,

    // ── Prompt errors ─────────────────────────────────────────────────────
    /// No prompt template is configured for the resolved category.
    #[error("No prompt template for document type: {category}")]
    PromptTemplateMissing { category: String },

    // ── Inference errors ──────────────────────────────────────────────────
    /// The inference service answered with a non-success status.
    #[error("LLM service error ({status}): {body}")]
    InferenceService { status: u16, body: String },

    /// The inference service could not be reached or the stream broke.
    #[error("LLM service unreachable at '{url}': {reason}")]
    InferenceUnreachable { url: String, reason: String },

    /// The inference call exceeded its time budget.
    #[error("LLM call timed out after {secs}s")]
    InferenceTimeout { secs: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// No parseable JSON value could be isolated from the model output.
    #[error("Could not extract valid JSON from response: {preview:?}")]
    JsonExtraction { preview: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Build a [`IngestError::JsonExtraction`] keeping only a bounded preview
    /// of the offending model output.
    pub fn json_extraction(raw: &str) -> Self {
        let preview: String = raw.chars().take(DIAGNOSTIC_PREVIEW_CHARS).collect();
        IngestError::JsonExtraction { preview }
    }

    /// Status class for the HTTP boundary.
    pub fn class(&self) -> ErrorClass {
        match self {
            IngestError::EmptyTranscript => ErrorClass::ClientInput,
            IngestError::OcrService { .. }
            | IngestError::OcrUnreachable { .. }
            | IngestError::InferenceService { .. }
            | IngestError::InferenceUnreachable { .. }
            | IngestError::InferenceTimeout { .. } => ErrorClass::Upstream,
            IngestError::PromptTemplateMissing { .. }
            | IngestError::JsonExtraction { .. }
            | IngestError::InvalidConfig(_)
            | IngestError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether the orchestrator may retry the inference call after this error.
    ///
    /// Only connection failures and 5xx answers qualify. A timeout already
    /// spent minutes waiting, and a 4xx will not change on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            IngestError::InferenceUnreachable { .. } => true,
            IngestError::InferenceService { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Stable machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::OcrService { .. } => "OCR_SERVICE_ERROR",
            IngestError::OcrUnreachable { .. } => "OCR_UNREACHABLE",
            IngestError::EmptyTranscript => "EMPTY_TRANSCRIPT",
            IngestError::PromptTemplateMissing { .. } => "PROMPT_TEMPLATE_MISSING",
            IngestError::InferenceService { .. } => "INFERENCE_SERVICE_ERROR",
            IngestError::InferenceUnreachable { .. } => "INFERENCE_UNREACHABLE",
            IngestError::InferenceTimeout { .. } => "INFERENCE_TIMEOUT",
            IngestError::JsonExtraction { .. } => "JSON_EXTRACTION_ERROR",
            IngestError::InvalidConfig(_) => "INVALID_CONFIG",
            IngestError::Internal(_) => "INTERNAL",
        }
    }
}

/// A non-fatal failure while mapping the extracted payload onto records.
///
/// Scoped to the whole category: when any field of any record fails, the
/// result carries this error and no records at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    /// The payload (or a nested value) had the wrong JSON shape.
    #[error("expected {expected} at '{path}', found {found}")]
    WrongShape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A value had the right shape but could not be coerced.
    #[error("invalid value at '{path}': {detail}")]
    InvalidValue { path: String, detail: String },
}
