use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cache::CacheError;

/// Errors a handler can return. Rendered as `{"error": {"code", "message"}}`.
///
/// Pipeline steps never surface here; they degrade to empty results instead.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Well-formed input whose content cannot be used, such as an unreadable resume PDF.
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::UnprocessableEntity(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE_ENTITY")
            }
            AppError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::UnprocessableEntity(msg) => msg.clone(),
            AppError::Cache(e) => e.to_string(),
            AppError::Internal(e) => e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{code}: {self:?}");
        } else {
            tracing::warn!("Rejected request: {self}");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.message()
            }
        }));

        (status, body).into_response()
    }
}

/// Turns a handler panic into the regular 500 error body.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = panic.downcast_ref::<&str>() {
        text.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(anyhow::anyhow!("request handler panicked: {detail}")).into_response()
}
