//! tr-api: HTTP surface for topic-relay
//!
//! Serves the chat page and the JSON chat endpoints on top of the dialogue
//! controller. Built with axum; sessions travel in a cookie.

pub mod error;
pub mod handlers;
pub mod page;
pub mod routes;
pub mod server;
pub mod session;

pub use error::{ApiError, Result};
pub use server::{AppState, build_router, start_server};
