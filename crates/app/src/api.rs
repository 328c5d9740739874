use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::BytesRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use pdf_qa_core::{DocumentAnswer, SessionStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_name: String,
    pub chunk_count: usize,
    pub page_count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pdf-qa-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.service.status().await)
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    // Non-multipart bodies are treated the same as a form without the field.
    let mut multipart = multipart.map_err(|_| ApiError::bad_request("No file part in the request"))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(read_rejection)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(read_rejection)?;
        upload = Some((original_name, bytes));
        break;
    }

    let (original_name, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("No file part in the request"))?;
    if original_name.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }

    let file_name = sanitize_file_name(&original_name);
    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(ApiError::bad_request("Only PDF files are allowed"));
    }

    let path = state.uploads_dir.join(&file_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|error| ApiError::Ingest(error.into()))?;
    info!(
        file_name = %file_name,
        original_name = %original_name,
        bytes = bytes.len(),
        path = %path.display(),
        "upload stored"
    );

    let report = state.service.ingest(&path, &file_name).await?;
    Ok(Json(UploadResponse {
        message: "PDF uploaded and indexed successfully".to_string(),
        file_name: report.fingerprint.file_name,
        chunk_count: report.chunk_count,
        page_count: report.fingerprint.page_count,
    }))
}

/// The body is read as JSON whatever the declared content type; anything that
/// does not parse counts as a missing question.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<DocumentAnswer>, ApiError> {
    let body = body.map_err(|rejection| {
        let status = rejection.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "Request body is too large".to_string()
        } else {
            rejection.body_text()
        };
        ApiError::Rejected { status, message }
    })?;
    let request = serde_json::from_slice::<AskRequest>(&body).unwrap_or_default();
    let answer = state.service.ask(&request.question).await?;
    Ok(Json(answer))
}

fn read_rejection(error: MultipartError) -> ApiError {
    let status = error.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Rejected {
            status,
            message: "Uploaded file is too large".to_string(),
        }
    } else {
        ApiError::Rejected {
            status,
            message: error.body_text(),
        }
    }
}

/// Reduce a client-supplied file name to `[A-Za-z0-9_.-]`. Accented letters
/// are decomposed (NFKD) so their base letter survives, path separators and
/// whitespace runs become a single `_`, other characters are dropped, and
/// leading or trailing dots and underscores are trimmed. May return "".
pub fn sanitize_file_name(raw: &str) -> String {
    let spaced = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect::<String>();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
