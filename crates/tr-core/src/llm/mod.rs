//! Generation provider abstraction and HTTP clients
//!
//! Supports both the Google Generative Language API and OpenAI-compatible APIs.

mod client;
mod types;

use async_trait::async_trait;

use crate::Result;

pub use client::LlmClient;
pub use types::*;

/// A stateless single-turn text generator.
///
/// Implementations receive one fully-built prompt and return the generated
/// text. Any failure (network, quota, malformed output) is an `Err`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
