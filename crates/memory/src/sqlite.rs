//! SQLite session store.
//!
//! Uses a single SQLite database file with two tables:
//! - `sessions`: one row per session id
//! - `messages`: one row per sender message, ordered by insertion
//!
//! Turns are rebuilt from message rows on fetch.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::error::StoreError;
use parley_core::session::{Sender, Session, SessionId, SessionStore, StoredMessage, Turn};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// A durable session store backed by SQLite.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) a session database.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // An in-memory database exists per connection, so keep one.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite session store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id          TEXT PRIMARY KEY NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id   TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                sender       TEXT NOT NULL,
                text         TEXT NOT NULL,
                is_feedback  INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("session index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    async fn ensure_session(conn: &mut SqliteConnection, id: &SessionId) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at) VALUES (?1, ?2)")
            .bind(id.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(conn)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT session failed: {e}")))?;
        Ok(())
    }

    async fn insert_message(
        conn: &mut SqliteConnection,
        id: &SessionId,
        sender: Sender,
        text: &str,
        is_feedback: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (session_id, sender, text, is_feedback, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id.as_str())
        .bind(sender.as_str())
        .bind(text)
        .bind(is_feedback)
        .bind(Utc::now().to_rfc3339())
        .execute(conn)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT message failed: {e}")))?;
        Ok(())
    }

    /// Parse a `StoredMessage` from a SQLite row. Unknown senders are skipped.
    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Option<StoredMessage>, StoreError> {
        let sender: String = row
            .try_get("sender")
            .map_err(|e| StoreError::QueryFailed(format!("sender column: {e}")))?;
        let text: String = row
            .try_get("text")
            .map_err(|e| StoreError::QueryFailed(format!("text column: {e}")))?;
        let is_feedback: bool = row
            .try_get("is_feedback")
            .map_err(|e| StoreError::QueryFailed(format!("is_feedback column: {e}")))?;

        let Some(sender) = Sender::parse(&sender) else {
            warn!(sender = %sender, "Skipping message row with unknown sender");
            return Ok(None);
        };

        Ok(Some(StoredMessage {
            sender,
            text,
            is_feedback,
        }))
    }

    /// Number of known sessions.
    pub async fn session_count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT failed: {e}")))?;
        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt as usize)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, id: &SessionId) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to acquire connection: {e}")))?;
        Self::ensure_session(&mut *conn, id).await?;
        debug!(session_id = %id, "Session created");
        Ok(())
    }

    async fn fetch(&self, id: &SessionId) -> Result<Session, StoreError> {
        let rows = sqlx::query(
            "SELECT sender, text, is_feedback FROM messages WHERE session_id = ?1 ORDER BY iid",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("SELECT messages failed: {e}")))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(msg) = Self::row_to_message(row)? {
                messages.push(msg);
            }
        }
        Ok(Session::from_messages(id, &messages))
    }

    async fn append(
        &self,
        id: &SessionId,
        sender: Sender,
        text: &str,
        is_feedback: bool,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;
        Self::ensure_session(&mut *tx, id).await?;
        Self::insert_message(&mut *tx, id, sender, text, is_feedback).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))
    }

    async fn append_turn(&self, id: &SessionId, turn: &Turn) -> Result<(), StoreError> {
        // Dropping the transaction before commit rolls both rows back
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;
        Self::ensure_session(&mut *tx, id).await?;
        Self::insert_message(&mut *tx, id, Sender::User, &turn.user_message, turn.is_feedback).await?;
        Self::insert_message(&mut *tx, id, Sender::Bot, &turn.bot_response, turn.is_feedback).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;
        debug!(session_id = %id, "Turn appended");
        Ok(())
    }
}
