use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pdf_qa_core::{AskError, IngestError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// The one place where core errors become HTTP responses. Every body is
/// `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Failed to process PDF: {0}")]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Ask(#[from] AskError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ask(AskError::EmptyQuestion | AskError::NoDocument) => StatusCode::BAD_REQUEST,
            Self::Ask(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
