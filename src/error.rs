use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("invalid submission: {0}")]
    Validation(String),

    // store or catalog unavailable / timed out; safe to retry with backoff
    #[error("temporarily unavailable: {0}")]
    Transient(String),

    // never surfaced to callers: the decider consumes it and commits anyway
    #[error("certificate rendering failed: {0}")]
    Rendering(String),
}

impl EngineError {
    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Rendering(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error=%self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
