//! Session persistence using SQLite

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::llm::Message;
use crate::session::store::ensure_seed;
use crate::session::{ConversationHistory, Session, SessionStore};
use crate::{Error, Result};

/// SQLite-based session store
pub struct SqliteSessionStore {
    seed: String,
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: impl AsRef<Path>, seed: impl Into<String>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn, seed)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory(seed: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, seed)
    }

    fn with_connection(conn: Connection, seed: impl Into<String>) -> Result<Self> {
        let store = Self {
            seed: seed.into(),
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Other("session database lock poisoned".to_string()))
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        self.conn()?.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                messages TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn save(conn: &Connection, session: &Session) -> Result<()> {
        let messages_json = serde_json::to_string(session.history.messages())?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (id, messages, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                messages_json,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load a session row.
    ///
    /// A row whose history does not start with this store's seed is treated
    /// as stale and comes back re-seeded.
    fn load(&self, conn: &Connection, id: &str) -> Result<Option<Session>> {
        let row = conn
            .query_row(
                "SELECT messages, created_at, updated_at FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((messages_json, created_at, updated_at)) = row else {
            return Ok(None);
        };

        let messages: Vec<Message> = serde_json::from_str(&messages_json)?;
        let created_at = parse_timestamp(&created_at)?;
        let updated_at = parse_timestamp(&updated_at)?;

        let history = match ConversationHistory::from_stored(&self.seed, messages) {
            Some(history) => history,
            None => {
                warn!("Stored history for session {} has a foreign seed, re-seeding", id);
                ConversationHistory::seeded(self.seed.as_str())
            }
        };

        Ok(Some(Session {
            id: id.to_string(),
            history,
            created_at,
            updated_at,
        }))
    }

    fn load_or_new(&self, conn: &Connection, id: &str) -> Result<Session> {
        Ok(self
            .load(conn, id)?
            .unwrap_or_else(|| Session::new(id, self.seed.as_str())))
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn seed(&self) -> &str {
        &self.seed
    }

    async fn get_or_init(&self, session_id: &str) -> Result<ConversationHistory> {
        let conn = self.conn()?;
        if let Some(session) = self.load(&conn, session_id)? {
            debug!("Session loaded from store: {}", session_id);
            return Ok(session.history);
        }

        info!("Creating new session: {}", session_id);
        let session = Session::new(session_id, self.seed.as_str());
        Self::save(&conn, &session)?;
        Ok(session.history)
    }

    async fn get(&self, session_id: &str) -> Result<Option<ConversationHistory>> {
        let conn = self.conn()?;
        Ok(self.load(&conn, session_id)?.map(|s| s.history))
    }

    async fn replace(&self, session_id: &str, history: ConversationHistory) -> Result<()> {
        ensure_seed(&self.seed, &history)?;
        let conn = self.conn()?;
        let mut session = self.load_or_new(&conn, session_id)?;
        session.set_history(history);
        Self::save(&conn, &session)?;
        debug!("Replaced history for session: {}", session_id);
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<ConversationHistory> {
        let conn = self.conn()?;
        let mut session = self.load_or_new(&conn, session_id)?;
        session.clear_messages();
        Self::save(&conn, &session)?;
        info!("Cleared messages for session: {}", session_id);
        Ok(session.history)
    }

    async fn session_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid timestamp {:?}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "Only talk about tea.";

    #[tokio::test]
    async fn test_get_or_init_persists_seed() {
        let store = SqliteSessionStore::in_memory(SEED).unwrap();

        let history = store.get_or_init("session-1").await.unwrap();
        assert_eq!(history.messages(), &[Message::system(SEED)]);

        let again = store.get_or_init("session-1").await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(store.session_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_round_trip() {
        let store = SqliteSessionStore::in_memory(SEED).unwrap();
        let mut history = store.get_or_init("session-1").await.unwrap();
        history.push_user("Oolong?");
        history.push_assistant("Partially oxidised.");

        store.replace("session-1", history.clone()).await.unwrap();
        assert_eq!(store.get("session-1").await.unwrap(), Some(history));
    }

    #[tokio::test]
    async fn test_clear_resets_persisted_row() {
        let store = SqliteSessionStore::in_memory(SEED).unwrap();
        let mut history = store.get_or_init("session-1").await.unwrap();
        history.push_user("q");
        history.push_assistant("a");
        store.replace("session-1", history).await.unwrap();

        let cleared = store.clear("session-1").await.unwrap();
        assert_eq!(cleared.len(), 1);
        assert_eq!(store.get("session-1").await.unwrap().map(|h| h.len()), Some(1));
    }

    #[tokio::test]
    async fn test_replace_rejects_foreign_seed() {
        let store = SqliteSessionStore::in_memory(SEED).unwrap();
        store.get_or_init("session-1").await.unwrap();

        let mut foreign = ConversationHistory::seeded("Only talk about coffee.");
        foreign.push_user("Espresso?");
        let err = store.replace("session-1", foreign).await.unwrap_err();
        assert!(matches!(err, Error::Other(_)));

        let stored = store.get("session-1").await.unwrap().unwrap();
        assert_eq!(stored.messages(), &[Message::system(SEED)]);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");

        {
            let store = SqliteSessionStore::open(&path, SEED).unwrap();
            let mut history = store.get_or_init("session-1").await.unwrap();
            history.push_user("q");
            history.push_assistant("a");
            store.replace("session-1", history).await.unwrap();
        }

        let store = SqliteSessionStore::open(&path, SEED).unwrap();
        let history = store.get("session-1").await.unwrap().unwrap();
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_foreign_seed_is_reseeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");

        {
            let store = SqliteSessionStore::open(&path, "Only talk about coffee.").unwrap();
            let mut history = store.get_or_init("session-1").await.unwrap();
            history.push_user("espresso?");
            store.replace("session-1", history).await.unwrap();
        }

        let store = SqliteSessionStore::open(&path, SEED).unwrap();
        let history = store.get_or_init("session-1").await.unwrap();
        assert_eq!(history.messages(), &[Message::system(SEED)]);
    }
}
