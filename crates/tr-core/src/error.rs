//! Error types for tr-core

use thiserror::Error;

/// Main error type for tr-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for tr-core
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single dialogue operation.
///
/// Every variant is terminal for the request that produced it; nothing is
/// retried internally.
#[derive(Error, Debug)]
pub enum DialogueError {
    /// The user message was empty after trimming
    #[error("Message must not be empty")]
    InvalidInput,

    /// No provider credential is available
    #[error("Server is not configured: missing provider API key")]
    NotConfigured,

    /// The generation provider failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// The session store failed
    #[error("Session store error: {0}")]
    Store(#[from] Error),
}

impl DialogueError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotConfigured => "not_configured",
            Self::Provider(_) => "provider_error",
            Self::Store(_) => "store_error",
        }
    }
}
