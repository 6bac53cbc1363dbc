//! Session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::{Message, Role};

/// Ordered dialogue transcript.
///
/// The first message is always the `system` seed. Only `user` and
/// `assistant` messages can be appended after it, and `reset` is the only
/// way to shrink it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// A history holding only the system seed
    pub fn seeded(instruction: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(instruction)],
        }
    }

    /// Rebuild a history from stored messages.
    ///
    /// Returns `None` unless the first message is the system seed
    /// `instruction` and no other system message follows it.
    pub fn from_stored(instruction: &str, messages: Vec<Message>) -> Option<Self> {
        let (first, rest) = messages.split_first()?;
        if first.role != Role::System || first.content != instruction {
            return None;
        }
        if rest.iter().any(|m| m.role == Role::System) {
            return None;
        }
        Some(Self { messages })
    }

    /// All messages, seed first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The system seed
    pub fn system_message(&self) -> &Message {
        &self.messages[0]
    }

    /// Number of messages, including the seed
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether only the seed is present
    pub fn is_fresh(&self) -> bool {
        self.messages.len() == 1
    }

    /// Append a user message
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Append an assistant message
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Drop everything but the seed
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Number of completed user/assistant exchanges
    pub fn turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }
}

/// A conversation session as held by a store
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session identifier supplied by the transport
    pub id: String,
    /// Conversation transcript
    pub history: ConversationHistory,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session seeded with `instruction`
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: ConversationHistory::seeded(instruction),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the history
    pub fn set_history(&mut self, history: ConversationHistory) {
        self.history = history;
        self.updated_at = Utc::now();
    }

    /// Reset the history to its seed
    pub fn clear_messages(&mut self) {
        self.history.reset();
        self.updated_at = Utc::now();
    }
}
