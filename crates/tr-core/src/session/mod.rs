//! Session management module
//!
//! Per-client conversation histories behind the `SessionStore` trait, with an
//! in-memory and a SQLite backend.

mod sqlite;
mod store;
mod types;

use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::config::{SessionBackend, SessionConfig};

pub use sqlite::SqliteSessionStore;
pub use store::{MemorySessionStore, SessionStore};
pub use types::{ConversationHistory, Session};

/// Open the store selected by `config`, seeding new sessions with `seed`
pub fn open_store(config: &SessionConfig, seed: &str) -> Result<Arc<dyn SessionStore>> {
    match config.backend {
        SessionBackend::Memory => {
            info!("Using in-memory session store");
            Ok(Arc::new(MemorySessionStore::new(seed)))
        }
        SessionBackend::Sqlite => {
            info!("Using SQLite session store at {}", config.db_path);
            Ok(Arc::new(SqliteSessionStore::open(&config.db_path, seed)?))
        }
    }
}
