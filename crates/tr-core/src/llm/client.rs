//! Generation provider HTTP client
//!
//! Supports the Google Generative Language API and OpenAI-compatible APIs.
//! Every call is single-turn: one prompt in, one text out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::TextGenerator;
use super::types::*;

/// LLM API client
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a client from configuration.
    ///
    /// Returns `Ok(None)` when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        match config.api_key() {
            Some(api_key) => Self::new(config, api_key.to_string()).map(Some),
            None => Ok(None),
        }
    }

    /// Create a new client with an explicit API key
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key,
            model: config.model().to_string(),
            base_url: config.base_url().to_string(),
            provider: config.provider,
        })
    }

    /// Override the base URL (custom endpoints, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the provider type
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn gemini_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn openai_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send a prompt to the Gemini API
    async fn send_gemini_request(&self, prompt: &str) -> Result<String> {
        let url = self.gemini_url();
        debug!("Sending request to Gemini API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            warn!("Gemini API error: {} - {}", status, body);
            return Err(Error::Provider(describe_http_error(status, &body)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("Failed to parse response: {} - {}", e, body)))?;

        let text = parsed
            .text()
            .ok_or_else(|| Error::Provider(format!("Malformed response: {}", parsed.empty_reason())))?;

        info!("Gemini API response: {} chars", text.len());
        Ok(text)
    }

    /// Send a prompt to an OpenAI-compatible API
    async fn send_openai_request(&self, prompt: &str) -> Result<String> {
        let url = self.openai_url();
        debug!("Sending request to OpenAI-compatible API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&ChatCompletionRequest::from_prompt(&self.model, prompt))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status, body);
            return Err(Error::Provider(describe_http_error(status, &body)));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("Failed to parse response: {} - {}", e, body)))?;

        let text = parsed
            .text()
            .ok_or_else(|| Error::Provider("Malformed response: no content in first choice".to_string()))?;

        info!("OpenAI API response: {} chars", text.len());
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::Gemini => self.send_gemini_request(prompt).await,
            LlmProvider::OpenAi => self.send_openai_request(prompt).await,
        }
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }
}

/// Classify a transport failure. The URL is stripped so it never reaches
/// callers or logs.
fn request_error(e: reqwest::Error) -> Error {
    let e = e.without_url();
    if e.is_timeout() {
        Error::Provider(format!("Request timeout: {}", e))
    } else if e.is_connect() {
        Error::Provider(format!("Connection failed: {}", e))
    } else {
        Error::Http(e)
    }
}

/// Prefer the provider's own error message over the raw body
fn describe_http_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(parsed) => format!("{}: {}", status, parsed.error.message),
        Err(_) => format!("{}: {}", status, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some("test-key".to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_from_config_without_key() {
        let client = LlmClient::from_config(&LlmConfig::default()).unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn test_gemini_url() {
        let client = LlmClient::from_config(&config(LlmProvider::Gemini))
            .unwrap()
            .unwrap();
        assert_eq!(client.model(), "gemini-pro");
        assert_eq!(
            client.gemini_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_openai_url_with_custom_base() {
        let client = LlmClient::from_config(&config(LlmProvider::OpenAi))
            .unwrap()
            .unwrap()
            .with_base_url("http://localhost:11434/v1/");
        assert_eq!(client.openai_url(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(client.name(), "openai");
    }

    #[test]
    fn test_describe_http_error_uses_provider_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let msg = describe_http_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(msg, "400 Bad Request: API key not valid");

        let msg = describe_http_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "502 Bad Gateway: upstream down");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = LlmClient::from_config(&config(LlmProvider::Gemini))
            .unwrap()
            .unwrap();
        assert!(!format!("{:?}", client).contains("test-key"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_provider_error() {
        let client = LlmClient::from_config(&config(LlmProvider::Gemini))
            .unwrap()
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)), "unexpected error: {err:?}");
        assert!(!err.to_string().contains("test-key"));
        assert!(!format!("{err:?}").contains("test-key"));
    }

    #[tokio::test]
    async fn test_connection_failure_does_not_leak_key_through_controller() {
        use std::sync::Arc;

        use crate::dialogue::{DialogueController, DomainPrompt};
        use crate::session::MemorySessionStore;

        let client = LlmClient::new(&config(LlmProvider::Gemini), "SECRET-KEY-123".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let prompt = DomainPrompt::new("Python programming help");
        let store = Arc::new(MemorySessionStore::new(prompt.instruction()));
        let controller = DialogueController::new(prompt, store, Some(Arc::new(client)));

        let err = controller.send_message("s1", "hello").await.unwrap_err();
        assert_eq!(err.kind(), "provider_error");
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }
}
