//! tr-core: topic-relay core library
//!
//! Conversation sessions, the domain-restricted dialogue controller, the
//! generation provider clients and configuration.

pub mod config;
pub mod dialogue;
pub mod error;
pub mod llm;
pub mod session;

pub use config::{Config, DomainConfig, LlmConfig, LlmProvider, ServerConfig, SessionBackend, SessionConfig};
pub use dialogue::{DialogueController, DomainPrompt, SessionContext};
pub use error::{DialogueError, Error, Result};
pub use llm::{LlmClient, Message, Role, TextGenerator};
pub use session::{ConversationHistory, MemorySessionStore, Session, SessionStore, SqliteSessionStore};
