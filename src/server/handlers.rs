//! Request handlers.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};

use super::{ApiError, AppState};
use crate::category::{parse_requested_category, DocumentCategory};
use crate::ingest::ParseRequest;
use crate::records::{NormalizedResult, OcrReport};

/// Filename used when the upload part carries none.
const DEFAULT_FILENAME: &str = "upload";

/// Aggregate health of this service and both dependencies.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ingestor.health().await)
}

/// Passthrough of the inference service's model list.
pub async fn list_models(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.ingestor.list_models().await?))
}

/// Run the full pipeline on an uploaded document.
///
/// Form fields: `file` (required), `document_type` (default `auto`),
/// `include_raw_text` (default `false`).
pub async fn parse_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<NormalizedResult>, ApiError> {
    let form = read_form(multipart).await?;
    let upload = form
        .file
        .ok_or_else(|| ApiError::BadRequest("missing 'file' field".into()))?;

    let request = ParseRequest {
        category: form.category,
        include_raw_text: form.include_raw_text,
    };
    let result = state
        .ingestor
        .parse_document(&upload.content, &upload.filename, &request)
        .await?;
    Ok(Json(result))
}

/// OCR an uploaded document without calling the model.
pub async fn ocr_only(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrReport>, ApiError> {
    let form = read_form(multipart).await?;
    let upload = form
        .file
        .ok_or_else(|| ApiError::BadRequest("missing 'file' field".into()))?;

    let report = state
        .ingestor
        .ocr_only(&upload.content, &upload.filename)
        .await?;
    Ok(Json(report))
}

// ── Form parsing ─────────────────────────────────────────────────────────

struct Upload {
    filename: String,
    content: Vec<u8>,
}

#[derive(Default)]
struct ParseForm {
    file: Option<Upload>,
    category: Option<DocumentCategory>,
    include_raw_text: bool,
}

async fn read_form(mut multipart: Multipart) -> Result<ParseForm, ApiError> {
    let mut form = ParseForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .filter(|f| !f.is_empty())
                    .unwrap_or(DEFAULT_FILENAME)
                    .to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
                form.file = Some(Upload {
                    filename,
                    content: content.to_vec(),
                });
            }
            "document_type" => {
                let text = field_text(field).await?;
                form.category = parse_requested_category(&text)
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "include_raw_text" => {
                let text = field_text(field).await?;
                form.include_raw_text = parse_form_bool(&text).ok_or_else(|| {
                    ApiError::BadRequest(format!("include_raw_text must be a boolean, got {text:?}"))
                })?;
            }
            other => tracing::debug!("Ignoring unknown form field '{}'", other),
        }
    }

    Ok(form)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable form field: {e}")))
}

/// Form booleans as HTML forms and common clients send them.
fn parse_form_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_bools() {
        assert_eq!(parse_form_bool("TRUE"), Some(true));
        assert_eq!(parse_form_bool("on"), Some(true));
        assert_eq!(parse_form_bool("0"), Some(false));
        assert_eq!(parse_form_bool(""), Some(false));
        assert_eq!(parse_form_bool("maybe"), None);
    }
}
