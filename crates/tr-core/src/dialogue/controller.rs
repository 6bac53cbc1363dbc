//! Dialogue controller
//!
//! Drives the per-session state machine: a session is created lazily on its
//! first `start_session` or `send_message`, grows by one user and one
//! assistant message per successful exchange, and is reset to its seed by
//! `clear_session`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DialogueError, Error};
use crate::llm::{LlmClient, TextGenerator};
use crate::session::{self, ConversationHistory, SessionStore};

use super::DomainPrompt;

/// Presentation context returned by `start_session`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Domain label to show the user
    pub domain: String,
    /// Messages in the session, including the system seed
    pub message_count: usize,
}

/// Orchestrates sessions, the domain prompt and the generation provider
pub struct DialogueController {
    prompt: DomainPrompt,
    store: Arc<dyn SessionStore>,
    generator: Option<Arc<dyn TextGenerator>>,
    /// Serializes read-modify-write cycles per session id
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DialogueController {
    /// Create a controller.
    ///
    /// `store` must seed sessions with `prompt.instruction()`. A `None`
    /// generator means no credential is configured.
    pub fn new(
        prompt: DomainPrompt,
        store: Arc<dyn SessionStore>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        debug_assert_eq!(store.seed(), prompt.instruction());
        Self {
            prompt,
            store,
            generator,
            locks: DashMap::new(),
        }
    }

    /// Build the store and provider client described by `config`
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let prompt = DomainPrompt::new(config.domain.label.as_str());
        let store = session::open_store(&config.session, prompt.instruction())?;

        let generator: Option<Arc<dyn TextGenerator>> = match LlmClient::from_config(&config.llm)? {
            Some(client) => {
                info!(
                    "Generation provider: {} (model {})",
                    client.provider().as_str(),
                    client.model()
                );
                Some(Arc::new(client))
            }
            None => {
                warn!("No provider API key found; set GOOGLE_API_KEY or LLM_API_KEY");
                None
            }
        };

        Ok(Self::new(prompt, store, generator))
    }

    /// Domain label
    pub fn domain(&self) -> &str {
        self.prompt.label()
    }

    /// Domain prompt in use
    pub fn prompt(&self) -> &DomainPrompt {
        &self.prompt
    }

    /// Whether a provider credential is available
    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Ensure the session exists and return what the caller needs to render
    pub async fn start_session(&self, session_id: &str) -> Result<SessionContext, DialogueError> {
        let history = self.store.get_or_init(session_id).await?;
        debug!("Session {} started with {} messages", session_id, history.len());
        Ok(SessionContext {
            domain: self.prompt.label().to_string(),
            message_count: history.len(),
        })
    }

    /// Send a user message and return the assistant reply.
    ///
    /// On any error the stored history is left as it was before the call.
    pub async fn send_message(&self, session_id: &str, user_text: &str) -> Result<String, DialogueError> {
        let generator = self.generator.as_ref().ok_or(DialogueError::NotConfigured)?;

        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(DialogueError::InvalidInput);
        }

        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.exchange(session_id, user_text, generator.as_ref()).await
        };
        drop(lock);
        self.release_lock(session_id);

        result
    }

    async fn exchange(
        &self,
        session_id: &str,
        user_text: &str,
        generator: &dyn TextGenerator,
    ) -> Result<String, DialogueError> {
        let mut history = self.store.get_or_init(session_id).await?;
        history.push_user(user_text);

        let prompt = self.prompt.build_prompt(user_text);
        debug!("Calling {} for session {}", generator.name(), session_id);

        let reply = match generator.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Provider call failed for session {}: {}", session_id, e);
                return Err(DialogueError::Provider(provider_description(e)));
            }
        };

        history.push_assistant(reply.as_str());
        self.store.replace(session_id, history).await?;

        info!("Session {}: exchange completed ({} chars)", session_id, reply.len());
        Ok(reply)
    }

    /// Reset the session to its system seed
    pub async fn clear_session(&self, session_id: &str) -> Result<ConversationHistory, DialogueError> {
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.store.clear(session_id).await
        };
        drop(lock);
        self.release_lock(session_id);

        Ok(result?)
    }

    /// Snapshot of a session's history, without creating the session
    pub async fn history(&self, session_id: &str) -> Result<Option<ConversationHistory>, DialogueError> {
        Ok(self.store.get(session_id).await?)
    }

    /// Number of sessions known to the store
    pub async fn session_count(&self) -> Result<usize, DialogueError> {
        Ok(self.store.session_count().await?)
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once no request holds or waits on it
    fn release_lock(&self, session_id: &str) {
        self.locks
            .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn provider_description(e: Error) -> String {
    match e {
        Error::Provider(msg) => msg,
        other => other.to_string(),
    }
}
