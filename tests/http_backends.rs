//! The real HTTP clients against throwaway local services.
//!
//! Each test binds an axum app on `127.0.0.1:0` that imitates the OCR
//! service (`POST /ocr`, `GET /health`) and/or the inference service
//! (`POST /api/generate` streaming NDJSON, `GET /api/tags`).

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use findoc_ingest::{
    DependencyStatus, DocumentCategory, InferenceEngine, IngestConfig, IngestError, Ingestor,
    OllamaClient, ParseRequest, SuryaOcrClient, TextExtractor,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn config_for(base: &str) -> IngestConfig {
    IngestConfig::builder()
        .ocr_url(base)
        .inference_url(base)
        .model("test-model")
        .health_timeout_secs(2)
        .build()
        .unwrap()
}

/// `/ocr` answering `"<filename>:<size>"` for the uploaded part.
async fn echo_ocr(mut multipart: Multipart) -> impl IntoResponse {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap();
            return Json(json!({"text": format!("{filename}:{}", bytes.len()), "pages": 1}));
        }
    }
    Json(json!({"error": "no file"}))
}

/// `/api/generate` streaming `lines` as separate body chunks.
fn streaming(lines: &'static [&'static str]) -> Body {
    let chunks = lines.iter().map(|l| Ok::<_, std::io::Error>(*l));
    Body::from_stream(futures::stream::iter(chunks))
}

// ── OCR client ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ocr_uploads_file_part_with_filename() {
    let base = spawn(Router::new().route("/ocr", post(echo_ocr))).await;
    let client = SuryaOcrClient::new(&config_for(&base)).unwrap();

    let text = client.extract_text(b"%PDF-1.7 body", "scan.pdf").await.unwrap();
    assert_eq!(text, "scan.pdf:13");
}

#[tokio::test]
async fn ocr_error_status_keeps_body() {
    let app = Router::new().route(
        "/ocr",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "surya crashed") }),
    );
    let base = spawn(app).await;
    let client = SuryaOcrClient::new(&config_for(&base)).unwrap();

    match client.extract_text(b"x", "x.png").await {
        Err(IngestError::OcrService { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "surya crashed");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn ocr_closed_port_is_unreachable() {
    let client = SuryaOcrClient::new(&config_for(&closed_url().await)).unwrap();
    let err = client.extract_text(b"x", "x.png").await.unwrap_err();
    assert!(matches!(err, IngestError::OcrUnreachable { .. }), "{err:?}");
}

#[tokio::test]
async fn ocr_health_distinguishes_unhealthy_from_unreachable() {
    let app = Router::new().route(
        "/health",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
    );
    let base = spawn(app).await;
    let client = SuryaOcrClient::new(&config_for(&base)).unwrap();
    assert_eq!(client.health().await, DependencyStatus::Unhealthy);

    let base = spawn(Router::new().route("/health", get(|| async { "ok" }))).await;
    let client = SuryaOcrClient::new(&config_for(&base)).unwrap();
    assert_eq!(client.health().await, DependencyStatus::Healthy);

    let client = SuryaOcrClient::new(&config_for(&closed_url().await)).unwrap();
    assert_eq!(client.health().await, DependencyStatus::Unreachable);
}

// ── Inference client ─────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_aggregates_streamed_fragments() {
    type Seen = Arc<Mutex<Vec<Value>>>;
    let seen: Seen = Arc::default();

    async fn generate(State(seen): State<Seen>, Json(body): Json<Value>) -> Body {
        seen.lock().unwrap().push(body);
        streaming(&[
            "{\"response\":\"{\\\"bill\\\":\",\"done\":false}\n{\"resp",
            "onse\":\" {}}\",\"done\":false}\n",
            "garbage line\n",
            "{\"response\":\"\",\"done\":true}\n",
            "{\"response\":\"after done\",\"done\":false}\n",
        ])
    }

    let app = Router::new()
        .route("/api/generate", post(generate))
        .with_state(seen.clone());
    let base = spawn(app).await;
    let client = OllamaClient::new(&config_for(&base)).unwrap();

    let text = client.generate("PROMPT").await.unwrap();
    assert_eq!(text, "{\"bill\": {}}");

    let body = seen.lock().unwrap().pop().unwrap();
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["prompt"], "PROMPT");
    assert_eq!(body["stream"], true);
    assert_eq!(body["options"]["num_predict"], 4096);
}

#[tokio::test]
async fn generate_error_status_is_service_error() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async { (StatusCode::BAD_GATEWAY, "model load failed") }),
    );
    let base = spawn(app).await;
    let client = OllamaClient::new(&config_for(&base)).unwrap();

    let err = client.generate("p").await.unwrap_err();
    assert!(matches!(err, IngestError::InferenceService { status: 502, .. }), "{err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn generate_past_deadline_is_timeout() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{\"response\":\"late\",\"done\":true}\n"
        }),
    );
    let base = spawn(app).await;
    let config = IngestConfig::builder()
        .inference_url(&base)
        .inference_timeout_secs(1)
        .build()
        .unwrap();
    let client = OllamaClient::new(&config).unwrap();

    let err = client.generate("p").await.unwrap_err();
    assert!(matches!(err, IngestError::InferenceTimeout { secs: 1 }), "{err:?}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn cancelled_generate_closes_the_stream() {
    /// Flags the shared bool when the response stream is dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let dropped = Arc::new(AtomicBool::new(false));

    async fn endless(State(dropped): State<Arc<AtomicBool>>) -> Body {
        let flag = DropFlag(dropped);
        let chunks = futures::stream::unfold(flag, |flag| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Some((
                Ok::<_, std::io::Error>("{\"response\":\"x\",\"done\":false}\n"),
                flag,
            ))
        });
        Body::from_stream(chunks)
    }

    let app = Router::new()
        .route("/api/generate", post(endless))
        .with_state(dropped.clone());
    let base = spawn(app).await;
    let client = OllamaClient::new(&config_for(&base)).unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(300), client.generate("p")).await;
    assert!(outcome.is_err(), "endless stream must not complete");

    for _ in 0..100 {
        if dropped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(dropped.load(Ordering::SeqCst), "server stream still open after cancel");
}

#[tokio::test]
async fn list_models_passes_tags_through() {
    let app = Router::new().route(
        "/api/tags",
        get(|| async { Json(json!({"models": [{"name": "llama3.1:8b", "size": 4920753328u64}]})) }),
    );
    let base = spawn(app).await;
    let client = OllamaClient::new(&config_for(&base)).unwrap();

    let models = client.list_models().await.unwrap();
    assert_eq!(models["models"][0]["name"], "llama3.1:8b");
    assert_eq!(client.health().await, DependencyStatus::Healthy);
}

#[tokio::test]
async fn list_models_failure_is_upstream() {
    let base = spawn(Router::new()).await;
    let client = OllamaClient::new(&config_for(&base)).unwrap();
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, IngestError::InferenceService { status: 404, .. }), "{err:?}");
    assert_eq!(client.health().await, DependencyStatus::Unhealthy);

    let client = OllamaClient::new(&config_for(&closed_url().await)).unwrap();
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, IngestError::InferenceUnreachable { .. }), "{err:?}");
}

// ── Whole pipeline over HTTP ─────────────────────────────────────────────────

#[tokio::test]
async fn ingestor_runs_against_both_services() {
    let app = Router::new()
        .route(
            "/ocr",
            post(|| async {
                Json(json!({"text": "City Water\nWater bill\nService period October\nTotal 41.00"}))
            }),
        )
        .route(
            "/api/generate",
            post(|| async {
                streaming(&[
                    "{\"response\":\"```json\\n{\\\"bill\\\": {\\\"name\\\": \\\"City Water\\\", \",\"done\":false}\n",
                    "{\"response\":\"\\\"amount\\\": 41.0, \\\"dueDay\\\": 28}}\\n```\",\"done\":false}\n",
                    "{\"response\":\"\",\"done\":true}\n",
                ])
            }),
        );
    let base = spawn(app).await;
    let ingestor = Ingestor::new(config_for(&base)).unwrap();

    let result = ingestor
        .parse_document(b"jpeg", "water.jpg", &ParseRequest::default())
        .await
        .unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.category, DocumentCategory::Bill);
    assert_eq!(result.bills[0].name, "City Water");
    assert_eq!(result.bills[0].due_day, 28);
}
