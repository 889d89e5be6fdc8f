//! In-process fake backends shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use findoc_ingest::{
    DependencyStatus, InferenceEngine, IngestConfig, IngestError, Ingestor, PromptLibrary,
    TextExtractor,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// OCR backend returning a fixed transcript, or a fixed failure.
pub struct FakeOcr {
    transcript: Option<String>,
    status: DependencyStatus,
    pub calls: AtomicUsize,
}

impl FakeOcr {
    pub fn text(transcript: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: Some(transcript.to_string()),
            status: DependencyStatus::Healthy,
            calls: AtomicUsize::new(0),
        })
    }

    /// Every call fails as if the OCR service answered 500.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            transcript: None,
            status: DependencyStatus::Unhealthy,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextExtractor for FakeOcr {
    async fn extract_text(&self, _content: &[u8], _filename: &str) -> Result<String, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.transcript {
            Some(ref t) => Ok(t.clone()),
            None => Err(IngestError::OcrService {
                status: 500,
                body: "ocr exploded".into(),
            }),
        }
    }

    async fn health(&self) -> DependencyStatus {
        self.status
    }
}

/// Inference backend replaying scripted answers and recording prompts.
pub struct FakeLlm {
    answers: Mutex<VecDeque<Result<String, IngestError>>>,
    pub prompts: Mutex<Vec<String>>,
    status: DependencyStatus,
}

impl FakeLlm {
    pub fn answering(text: &str) -> Arc<Self> {
        Self::scripted(vec![Ok(text.to_string())])
    }

    pub fn scripted(answers: Vec<Result<String, IngestError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
            status: DependencyStatus::Unreachable,
        })
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl InferenceEngine for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String, IngestError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(IngestError::Internal("fake LLM ran out of answers".into())))
    }

    async fn list_models(&self) -> Result<Value, IngestError> {
        Ok(json!({"models": [{"name": "fake:latest"}]}))
    }

    async fn health(&self) -> DependencyStatus {
        self.status
    }
}

pub fn ingestor(ocr: Arc<FakeOcr>, llm: Arc<FakeLlm>) -> Ingestor {
    ingestor_with(IngestConfig::default(), PromptLibrary::builtin(), ocr, llm)
}

pub fn ingestor_with(
    config: IngestConfig,
    prompts: PromptLibrary,
    ocr: Arc<FakeOcr>,
    llm: Arc<FakeLlm>,
) -> Ingestor {
    Ingestor::with_backends(config, prompts, ocr, llm)
}
