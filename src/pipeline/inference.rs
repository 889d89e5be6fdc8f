//! LLM interaction: stream a completion from the inference service.
//!
//! The service answers `POST /api/generate` with newline-delimited JSON
//! objects, each carrying a `response` fragment and a `done` flag. The
//! request always asks for streaming so bytes keep flowing while a slow
//! local model works through a long statement.
//!
//! Fragments are appended in arrival order. Aggregation stops at the first
//! `done: true` object. Lines that do not parse are skipped. Dropping the
//! future returned by [`InferenceEngine::generate`] drops the response
//! stream and closes the connection, so a cancelled request leaves nothing
//! running on our side.
//!
//! No retry happens here; see [`crate::ingest::Ingestor`].

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::health::{probe, DependencyStatus};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// The model-inference capability.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Run `prompt` through the model and return the full response text.
    async fn generate(&self, prompt: &str) -> Result<String, IngestError>;

    /// Models known to the service, as the service reports them.
    async fn list_models(&self) -> Result<Value, IngestError>;

    /// Best-effort reachability probe.
    async fn health(&self) -> DependencyStatus;
}

/// Request body for `/api/generate`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    #[serde(rename = "num_predict")]
    max_output_tokens: usize,
}

/// One streamed line from `/api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Incremental NDJSON aggregator.
///
/// Network chunks do not respect line boundaries (or UTF-8 boundaries), so
/// bytes are buffered until a full line is available.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    pending: Vec<u8>,
    text: String,
    done: bool,
    skipped: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes. Returns `true` once a chunk has signalled completion;
    /// further input is ignored after that.
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        if self.done {
            return true;
        }
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line[..line.len() - 1]);
            if self.done {
                self.pending.clear();
                break;
            }
        }
        self.done
    }

    /// Flush a trailing unterminated line and return the aggregated text.
    pub fn finish(mut self) -> String {
        if !self.done && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.consume_line(&line);
        }
        if self.skipped > 0 {
            warn!("Skipped {} malformed stream line(s)", self.skipped);
        }
        self.text
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Text aggregated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn consume_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<GenerateChunk>(line) {
            Ok(chunk) => {
                self.text.push_str(&chunk.response);
                if chunk.done {
                    self.done = true;
                }
            }
            Err(e) => {
                debug!("Skipping malformed stream line: {}", e);
                self.skipped += 1;
            }
        }
    }
}

/// HTTP client for an Ollama-compatible inference service.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: usize,
    timeout: Duration,
    health_timeout: Duration,
    models_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &IngestConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.inference_connect_timeout())
            .build()
            .map_err(|e| IngestError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.inference_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.inference_timeout(),
            health_timeout: config.health_timeout(),
            models_timeout: config.models_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_error(&self, e: reqwest::Error) -> IngestError {
        if e.is_timeout() {
            IngestError::InferenceTimeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            IngestError::InferenceUnreachable {
                url: self.base_url.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl InferenceEngine for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, IngestError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
            options: GenerateOptions {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::InferenceService {
                status: status.as_u16(),
                body,
            });
        }

        let mut acc = StreamAccumulator::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| self.request_error(e))?;
            if acc.push(&bytes) {
                break;
            }
        }

        if !acc.is_done() {
            debug!("Inference stream ended without a done marker");
        }
        Ok(acc.finish())
    }

    async fn list_models(&self) -> Result<Value, IngestError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.models_timeout)
            .send()
            .await
            .map_err(|e| IngestError::InferenceUnreachable {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::InferenceService {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| IngestError::InferenceUnreachable {
                url: self.base_url.clone(),
                reason: format!("unreadable model list: {e}"),
            })
    }

    async fn health(&self) -> DependencyStatus {
        probe(
            &self.client,
            &format!("{}/api/tags", self.base_url),
            self.health_timeout,
        )
        .await
    }
}
