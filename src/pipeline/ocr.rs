//! OCR interaction: upload the document and read back its transcript.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::health::{probe, DependencyStatus};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// The text-extraction capability.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the transcript of `content`. `filename` carries the extension
    /// the service uses to pick a decoder (`.pdf`, `.png`, ...).
    async fn extract_text(&self, content: &[u8], filename: &str) -> Result<String, IngestError>;

    /// Best-effort reachability probe.
    async fn health(&self) -> DependencyStatus;
}

/// Response body from `POST /ocr`.
#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: String,
}

/// HTTP client for the OCR service.
#[derive(Debug, Clone)]
pub struct SuryaOcrClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    health_timeout: Duration,
}

impl SuryaOcrClient {
    pub fn new(config: &IngestConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| IngestError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.ocr_url.trim_end_matches('/').to_string(),
            timeout: config.ocr_timeout(),
            health_timeout: config.health_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn unreachable(&self, reason: impl Into<String>) -> IngestError {
        IngestError::OcrUnreachable {
            url: self.base_url.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextExtractor for SuryaOcrClient {
    async fn extract_text(&self, content: &[u8], filename: &str) -> Result<String, IngestError> {
        let url = format!("{}/ocr", self.base_url);
        let part = Part::bytes(content.to_vec()).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        debug!("Uploading {} ({} bytes) to {}", filename, content.len(), url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.unreachable(format!("timed out after {}s", self.timeout.as_secs()))
                } else {
                    self.unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::OcrService {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| self.unreachable(format!("unreadable OCR response: {e}")))?;

        Ok(parsed.text)
    }

    async fn health(&self) -> DependencyStatus {
        probe(
            &self.client,
            &format!("{}/health", self.base_url),
            self.health_timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_text_field_is_empty_transcript() {
        let r: OcrResponse = serde_json::from_str(r#"{"pages": 2}"#).unwrap();
        assert!(r.text.is_empty());
    }

    #[test]
    fn client_trims_base_url() {
        let config = IngestConfig::builder()
            .ocr_url("http://ocr:8001/")
            .build()
            .unwrap();
        let client = SuryaOcrClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://ocr:8001");
    }
}
