//! Request orchestration: one document in, one [`NormalizedResult`] out.
//!
//! [`Ingestor`] sequences the pipeline stages and is the single place that
//! decides what a failure means:
//!
//! | Stage | Failure | Outcome |
//! |-------|---------|---------|
//! | OCR | unreachable / non-2xx | `Err` (upstream) |
//! | OCR | blank transcript | `Err` (client input) |
//! | Prompt | no template for category | `Err` (internal) |
//! | Inference | unreachable / non-2xx / timeout | `Err` (upstream) |
//! | Extraction | no JSON in the answer | `Err` (internal) |
//! | Normalization | field cannot be coerced | `Ok` with `success = false` |
//!
//! Only the last row yields `Ok`: once the model has produced a payload,
//! the caller always gets a well-formed result object back.

use crate::category::DocumentCategory;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::health::HealthReport;
use crate::pipeline::inference::{InferenceEngine, OllamaClient};
use crate::pipeline::ocr::{SuryaOcrClient, TextExtractor};
use crate::pipeline::{classify, extract, normalize, truncate};
use crate::prompts::{assemble_prompt, PromptLibrary};
use crate::records::{NormalizedResult, OcrReport};
use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Characters of the model response logged at debug level.
const RESPONSE_PREVIEW_CHARS: usize = 500;

/// Options for a single parse request.
#[derive(Debug, Clone, Default)]
pub struct ParseRequest {
    /// Explicit category, or `None` to detect it from the transcript.
    pub category: Option<DocumentCategory>,
    /// Copy the full OCR transcript into the result.
    pub include_raw_text: bool,
}

/// The document-ingestion orchestrator.
///
/// Cheap to clone; every field is shared read-only state.
#[derive(Clone)]
pub struct Ingestor {
    config: Arc<IngestConfig>,
    prompts: Arc<PromptLibrary>,
    ocr: Arc<dyn TextExtractor>,
    llm: Arc<dyn InferenceEngine>,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("config", &self.config)
            .field("ocr", &"<dyn TextExtractor>")
            .field("llm", &"<dyn InferenceEngine>")
            .finish()
    }
}

impl Ingestor {
    /// Build an ingestor talking HTTP to the configured services.
    ///
    /// Prompt templates are loaded here, once.
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        let prompts = match config.prompts_dir {
            Some(ref dir) => PromptLibrary::load_dir(dir)?,
            None => PromptLibrary::builtin(),
        };
        let ocr = Arc::new(SuryaOcrClient::new(&config)?);
        let llm = Arc::new(OllamaClient::new(&config)?);
        Ok(Self::with_backends(config, prompts, ocr, llm))
    }

    /// Build an ingestor over arbitrary backends.
    pub fn with_backends(
        config: IngestConfig,
        prompts: PromptLibrary,
        ocr: Arc<dyn TextExtractor>,
        llm: Arc<dyn InferenceEngine>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            prompts: Arc::new(prompts),
            ocr,
            llm,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run the full pipeline on one document.
    ///
    /// # Errors
    /// Every stage up to and including JSON extraction is terminal; see the
    /// module docs. Normalization failures are reported inside the result.
    pub async fn parse_document(
        &self,
        content: &[u8],
        filename: &str,
        request: &ParseRequest,
    ) -> Result<NormalizedResult, IngestError> {
        self.parse_document_on(content, filename, request, Local::now().date_naive())
            .await
    }

    /// [`Ingestor::parse_document`] with an explicit processing day.
    pub async fn parse_document_on(
        &self,
        content: &[u8],
        filename: &str,
        request: &ParseRequest,
        today: NaiveDate,
    ) -> Result<NormalizedResult, IngestError> {
        let start = Instant::now();
        info!("Parsing {} ({} bytes)", filename, content.len());

        // ── Step 1: OCR ──────────────────────────────────────────────────
        let transcript = self.transcribe(content, filename).await?;

        // ── Step 2: Resolve category ─────────────────────────────────────
        let category = match request.category {
            Some(c) => c,
            None => {
                let detected = classify::classify(&transcript);
                info!("Detected document type: {}", detected);
                detected
            }
        };

        // ── Step 3: Prompt ───────────────────────────────────────────────
        let template = self.prompts.template(category)?;
        let bounded = truncate::truncate_for_context(&transcript, self.config.max_context_chars);
        debug!(
            "OCR text: {} chars, truncated to: {} chars",
            transcript.chars().count(),
            bounded.chars().count()
        );
        let prompt = assemble_prompt(template, &bounded);

        // ── Step 4: Inference ────────────────────────────────────────────
        debug!("Calling inference with {} chars", prompt.chars().count());
        let llm_start = Instant::now();
        let response = self.generate_with_retry(&prompt).await?;
        debug!(
            "Got LLM response: {} chars in {}ms",
            response.chars().count(),
            llm_start.elapsed().as_millis()
        );
        debug!(
            "Response preview: {}",
            response.chars().take(RESPONSE_PREVIEW_CHARS).collect::<String>()
        );

        // ── Step 5: Extract JSON ─────────────────────────────────────────
        let payload = extract::extract_json(&response)?;
        debug!("Parsed JSON keys: {}", describe_payload(&payload));

        // ── Step 6: Normalize ────────────────────────────────────────────
        let mut result = normalize::normalize(&payload, category, today);
        match result.error {
            None => info!(
                "Parsed {} as {}: {} records in {}ms",
                filename,
                category,
                result.record_count(),
                start.elapsed().as_millis()
            ),
            Some(ref e) => warn!("Normalization failed for {}: {}", filename, e),
        }

        if request.include_raw_text {
            result.raw_text = Some(transcript);
        }
        Ok(result)
    }

    /// OCR a document and classify it, without calling the model.
    pub async fn ocr_only(&self, content: &[u8], filename: &str) -> Result<OcrReport, IngestError> {
        let text = self.ocr.extract_text(content, filename).await?;
        let detected = classify::classify(&text);
        Ok(OcrReport::new(filename, text, detected))
    }

    /// Probe both dependencies concurrently.
    pub async fn health(&self) -> HealthReport {
        let (ocr, inference) = tokio::join!(self.ocr.health(), self.llm.health());
        HealthReport::new(ocr, inference)
    }

    /// Models known to the inference service.
    pub async fn list_models(&self) -> Result<Value, IngestError> {
        self.llm.list_models().await
    }

    async fn transcribe(&self, content: &[u8], filename: &str) -> Result<String, IngestError> {
        let text = self.ocr.extract_text(content, filename).await?;
        if text.trim().is_empty() {
            return Err(IngestError::EmptyTranscript);
        }
        Ok(text)
    }

    /// Call the model, retrying transient failures with exponential backoff
    /// (`retry_backoff_ms * 2^(attempt-1)`).
    async fn generate_with_retry(&self, prompt: &str) -> Result<String, IngestError> {
        let retries = self.config.inference_retries;
        let mut attempt = 0u32;
        loop {
            match self.llm.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < retries && e.is_transient() => {
                    attempt += 1;
                    let backoff = self
                        .config
                        .retry_backoff_ms
                        .saturating_mul(2u64.saturating_pow(attempt - 1));
                    warn!(
                        "Inference attempt {} failed, retry {}/{} after {}ms: {}",
                        attempt, attempt, retries, backoff, e
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn describe_payload(payload: &Value) -> String {
    match payload {
        Value::Object(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
        Value::Array(items) => format!("array of {}", items.len()),
        _ => "scalar".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describe_payload_lists_keys() {
        assert_eq!(describe_payload(&json!({"bill": {}})), "bill");
        assert_eq!(describe_payload(&json!([1, 2])), "array of 2");
        assert_eq!(describe_payload(&json!(3)), "scalar");
    }

    #[test]
    fn default_request_auto_detects() {
        let r = ParseRequest::default();
        assert!(r.category.is_none());
        assert!(!r.include_raw_text);
    }
}
