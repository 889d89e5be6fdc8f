//! HTTP API over the ingestion pipeline.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /parse` | full pipeline, returns a `NormalizedResult` |
//! | `POST /ocr-only` | transcript + detected category, no model call |
//! | `GET /health` | this service plus both dependencies |
//! | `GET /models` | passthrough of the inference service's model list |
//!
//! Requests are independent: handlers share only the read-only
//! [`Ingestor`]. When a client disconnects, axum drops the handler future,
//! which drops the in-flight inference stream with it.

mod error;
mod handlers;
mod routes;

pub use error::ApiError;
pub use routes::create_router;

use crate::ingest::Ingestor;
use std::net::SocketAddr;

/// Shared state for the web server.
#[derive(Clone, Debug)]
pub struct AppState {
    pub ingestor: Ingestor,
}

impl AppState {
    pub fn new(ingestor: Ingestor) -> Self {
        Self { ingestor }
    }
}

/// Start the web server and run until Ctrl-C.
pub async fn serve(ingestor: Ingestor, addr: SocketAddr) -> std::io::Result<()> {
    let app = create_router(AppState::new(ingestor));

    tracing::info!("Starting server at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
