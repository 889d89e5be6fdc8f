//! Configuration types for document ingestion.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. The config is loaded once at process start
//! and shared read-only by every request.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the ingestion pipeline and its two external services.
///
/// # Example
/// ```rust
/// use findoc_ingest::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .inference_url("http://gpu-box:11434")
///     .model("llama3.1:8b")
///     .max_context_chars(8000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_context_chars, 8000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Base URL of the OCR service (exposes `POST /ocr`, `GET /health`).
    pub ocr_url: String,

    /// Base URL of the inference service (exposes `POST /api/generate`,
    /// `GET /api/tags`).
    pub inference_url: String,

    /// Model name passed to the inference service. Default: `llama3.1:8b`.
    pub model: String,

    /// Directory holding `<category>.txt` prompt templates.
    /// If None, uses the built-in templates.
    pub prompts_dir: Option<PathBuf>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Kept low so the same transcript yields the same JSON.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_output_tokens: usize,

    /// Transcript character budget. Default: 10 000.
    ///
    /// Leaves room in an 8k-token context for the template (~1 000 chars)
    /// and the generated JSON.
    pub max_context_chars: usize,

    /// Per-call OCR timeout in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Total inference timeout in seconds. Default: 600.
    ///
    /// Local models on CPU can take several minutes for a long statement.
    pub inference_timeout_secs: u64,

    /// Connect timeout for the inference service in seconds. Default: 30.
    pub inference_connect_timeout_secs: u64,

    /// Timeout for each health probe in seconds. Default: 5.
    pub health_timeout_secs: u64,

    /// Timeout for the model listing passthrough in seconds. Default: 10.
    pub models_timeout_secs: u64,

    /// Retries for transient inference failures. Default: 0.
    pub inference_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Largest accepted upload in bytes. Default: 25 MiB.
    pub max_upload_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ocr_url: "http://localhost:8001".to_string(),
            inference_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            prompts_dir: None,
            temperature: 0.1,
            max_output_tokens: 4096,
            max_context_chars: 10_000,
            ocr_timeout_secs: 120,
            inference_timeout_secs: 600,
            inference_connect_timeout_secs: 30,
            health_timeout_secs: 5,
            models_timeout_secs: 10,
            inference_retries: 0,
            retry_backoff_ms: 500,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn inference_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_connect_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn models_timeout(&self) -> Duration {
        Duration::from_secs(self.models_timeout_secs)
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn ocr_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_url = url.into();
        self
    }

    pub fn inference_url(mut self, url: impl Into<String>) -> Self {
        self.config.inference_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.prompts_dir = Some(dir.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn max_context_chars(mut self, n: usize) -> Self {
        self.config.max_context_chars = n;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn inference_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference_timeout_secs = secs;
        self
    }

    pub fn inference_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference_connect_timeout_secs = secs;
        self
    }

    pub fn health_timeout_secs(mut self, secs: u64) -> Self {
        self.config.health_timeout_secs = secs;
        self
    }

    pub fn models_timeout_secs(mut self, secs: u64) -> Self {
        self.config.models_timeout_secs = secs;
        self
    }

    pub fn inference_retries(mut self, n: u32) -> Self {
        self.config.inference_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        for (name, url) in [("ocr_url", &c.ocr_url), ("inference_url", &c.inference_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(IngestError::InvalidConfig(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if c.model.trim().is_empty() {
            return Err(IngestError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_context_chars == 0 {
            return Err(IngestError::InvalidConfig(
                "max_context_chars must be ≥ 1".into(),
            ));
        }
        let timeouts = [
            ("ocr_timeout_secs", c.ocr_timeout_secs),
            ("inference_timeout_secs", c.inference_timeout_secs),
            ("inference_connect_timeout_secs", c.inference_connect_timeout_secs),
            ("health_timeout_secs", c.health_timeout_secs),
            ("models_timeout_secs", c.models_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(IngestError::InvalidConfig(format!("{name} must be ≥ 1")));
        }
        let mut config = self.config;
        config.ocr_url = config.ocr_url.trim_end_matches('/').to_string();
        config.inference_url = config.inference_url.trim_end_matches('/').to_string();
        Ok(config)
    }
}
