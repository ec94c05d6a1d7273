//! SQLite-backed queue snapshot store.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{QueueError, QueueState, QueueStore, StoredQueue};

const KEY_TICKETS: &str = "queue_tickets";
const KEY_COUNTERS: &str = "queue_counters";
const KEY_STATS: &str = "queue_stats";
const KEY_SEQUENCER: &str = "ticket_counters";

/// SQLite-backed queue store.
///
/// Each collection lives in its own row of `queue_state` as a JSON document.
pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
}

impl SqliteQueueStore {
    /// Create a new SQLite queue store, creating the database file and table if needed.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| QueueError::Storage(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite queue store (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory().map_err(|e| QueueError::Storage(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queue_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| QueueError::Storage(e.to_string()))?;

        Ok(())
    }

    fn read_entry<T: DeserializeOwned>(
        conn: &Connection,
        key: &str,
    ) -> Result<Option<T>, QueueError> {
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM queue_state WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| QueueError::Storage(e.to_string()))?;

        value
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| QueueError::Serialization(format!("{}: {}", key, e)))
            })
            .transpose()
    }

    fn write_entry<T: Serialize>(
        conn: &Connection,
        key: &str,
        value: &T,
        updated_at: &str,
    ) -> Result<(), QueueError> {
        let json = serde_json::to_string(value)
            .map_err(|e| QueueError::Serialization(format!("{}: {}", key, e)))?;
        conn.execute(
            "INSERT INTO queue_state (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, json, updated_at],
        )
        .map_err(|e| QueueError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl QueueStore for SqliteQueueStore {
    fn load(&self) -> Result<StoredQueue, QueueError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(StoredQueue {
            tickets: Self::read_entry(&conn, KEY_TICKETS)?,
            counters: Self::read_entry(&conn, KEY_COUNTERS)?,
            stats: Self::read_entry(&conn, KEY_STATS)?,
            sequencer: Self::read_entry(&conn, KEY_SEQUENCER)?,
        })
    }

    fn save(&self, state: &QueueState) -> Result<(), QueueError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn
            .transaction()
            .map_err(|e| QueueError::Storage(e.to_string()))?;

        let updated_at = Utc::now().to_rfc3339();
        Self::write_entry(&tx, KEY_TICKETS, &state.tickets, &updated_at)?;
        Self::write_entry(&tx, KEY_COUNTERS, &state.counters, &updated_at)?;
        Self::write_entry(&tx, KEY_STATS, &state.stats, &updated_at)?;
        Self::write_entry(&tx, KEY_SEQUENCER, &state.sequencer, &updated_at)?;

        tx.commit().map_err(|e| QueueError::Storage(e.to_string()))?;
        Ok(())
    }
}
