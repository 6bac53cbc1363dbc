//! Error types for tr-api

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use tr_core::DialogueError;

/// tr-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Dialogue(#[from] DialogueError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Generic API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Dialogue(DialogueError::InvalidInput) => StatusCode::BAD_REQUEST,
            Self::Dialogue(DialogueError::NotConfigured)
            | Self::Dialogue(DialogueError::Provider(_))
            | Self::Dialogue(DialogueError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
