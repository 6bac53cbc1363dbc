//! Route definitions
//!
//! Defines all HTTP endpoints.

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{chat, clear_session, health, index, session_info};
use crate::server::AppState;

/// Create the router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Chat page (starts the session)
        .route("/", get(index))
        // Chat endpoint
        .route("/chat", post(chat))
        // Reset conversation
        .route("/clear", post(clear_session))
        // Session info
        .route("/api/session", get(session_info))
        // Health check
        .route("/health", get(health))
}
