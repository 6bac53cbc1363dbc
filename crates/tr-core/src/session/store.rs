//! Session store contract and the in-memory backend

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::session::{ConversationHistory, Session};
use crate::{Error, Result};

/// Maps opaque session ids to conversation histories.
///
/// Every history a store hands out starts with the store's seed message.
/// Sessions never observe each other's history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The system instruction new histories are seeded with
    fn seed(&self) -> &str;

    /// Existing history for `session_id`, or a freshly seeded one
    async fn get_or_init(&self, session_id: &str) -> Result<ConversationHistory>;

    /// Existing history for `session_id` without creating one
    async fn get(&self, session_id: &str) -> Result<Option<ConversationHistory>>;

    /// Overwrite the stored history for `session_id`
    async fn replace(&self, session_id: &str, history: ConversationHistory) -> Result<()>;

    /// Reset `session_id` to its seed, returning the reset history
    async fn clear(&self, session_id: &str) -> Result<ConversationHistory>;

    /// Number of known sessions
    async fn session_count(&self) -> Result<usize>;
}

/// Reject a history seeded with anything other than `seed`
pub(crate) fn ensure_seed(seed: &str, history: &ConversationHistory) -> Result<()> {
    if history.system_message().content != seed {
        return Err(Error::Other(
            "history does not start with this store's system seed".to_string(),
        ));
    }
    Ok(())
}

/// Process-local session store
pub struct MemorySessionStore {
    seed: String,
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create an empty store seeding new sessions with `seed`
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn seed(&self) -> &str {
        &self.seed
    }

    async fn get_or_init(&self, session_id: &str) -> Result<ConversationHistory> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                debug!("Session found: {}", session_id);
                return Ok(session.history.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!("Creating new session: {}", session_id);
            Session::new(session_id, self.seed.as_str())
        });
        Ok(session.history.clone())
    }

    async fn get(&self, session_id: &str) -> Result<Option<ConversationHistory>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(|s| s.history.clone()))
    }

    async fn replace(&self, session_id: &str, history: ConversationHistory) -> Result<()> {
        ensure_seed(&self.seed, &history)?;
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, self.seed.as_str()))
            .set_history(history);
        debug!("Replaced history for session: {}", session_id);
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<ConversationHistory> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, self.seed.as_str()));
        session.clear_messages();
        info!("Cleared messages for session: {}", session_id);
        Ok(session.history.clone())
    }

    async fn session_count(&self) -> Result<usize> {
        Ok(self.sessions.read().await.len())
    }
}
