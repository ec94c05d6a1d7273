use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use super::{AuditError, AuditEvent, AuditFilter, AuditRecord, AuditStore};

/// SQLite-backed audit store
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

/// Timestamps are stored fixed-width so text comparison matches time order.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SqliteAuditStore {
    /// Create a new SQLite audit store, creating the database file and tables if needed
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path).map_err(|e| AuditError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite audit store (useful for testing)
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory().map_err(|e| AuditError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), AuditError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                ticket_id TEXT,
                counter_id INTEGER,
                user_id TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_ticket_id ON audit_events(ticket_id);
            CREATE INDEX IF NOT EXISTS idx_audit_events_counter_id ON audit_events(counter_id);
            CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
            CREATE INDEX IF NOT EXISTS idx_audit_events_user_id ON audit_events(user_id);
            "#,
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref ticket_id) = filter.ticket_id {
            conditions.push("ticket_id = ?");
            params.push(Box::new(ticket_id.clone()));
        }

        if let Some(counter_id) = filter.counter_id {
            conditions.push("counter_id = ?");
            params.push(Box::new(counter_id));
        }

        if let Some(ref event_type) = filter.event_type {
            conditions.push("event_type = ?");
            params.push(Box::new(event_type.clone()));
        }

        if let Some(ref user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id.clone()));
        }

        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(format_timestamp(from)));
        }

        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(format_timestamp(to)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, ticket_id, counter_id, user_id, data) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                format_timestamp(&record.timestamp),
                record.event_type,
                record.ticket_id,
                record.counter_id,
                record.user_id,
                data_json,
            ],
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, timestamp, event_type, ticket_id, counter_id, user_id, data FROM audit_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AuditError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let id: i64 = row.get(0)?;
                let timestamp_str: String = row.get(1)?;
                let event_type: String = row.get(2)?;
                let ticket_id: Option<String> = row.get(3)?;
                let counter_id: Option<u32> = row.get(4)?;
                let user_id: Option<String> = row.get(5)?;
                let data_json: String = row.get(6)?;

                Ok((id, timestamp_str, event_type, ticket_id, counter_id, user_id, data_json))
            })
            .map_err(|e| AuditError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, timestamp_str, event_type, ticket_id, counter_id, user_id, data_json) =
                row_result.map_err(|e| AuditError::Database(e.to_string()))?;

            let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            let data: AuditEvent = serde_json::from_str(&data_json)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            records.push(AuditRecord {
                id,
                timestamp,
                event_type,
                ticket_id,
                counter_id,
                user_id,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceType;
    use chrono::Duration;

    fn create_test_store() -> SqliteAuditStore {
        SqliteAuditStore::in_memory().unwrap()
    }

    fn service_started() -> AuditRecord {
        AuditRecord::from_event(
            Utc::now(),
            AuditEvent::ServiceStarted {
                version: "0.1.0".to_string(),
                config_hash: "abc123".to_string(),
            },
        )
    }

    fn ticket_called(ticket_id: &str, counter_id: u32, user_id: &str) -> AuditRecord {
        AuditRecord::from_event(
            Utc::now(),
            AuditEvent::TicketCalled {
                ticket_id: ticket_id.to_string(),
                display_code: "A001".to_string(),
                counter_id,
                called_by: user_id.to_string(),
            },
        )
    }

    #[test]
    fn test_insert_and_query() {
        let store = create_test_store();

        let id = store.insert(&service_started()).unwrap();
        assert!(id > 0);

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].event_type, "service_started");
    }

    #[test]
    fn test_event_data_round_trips() {
        let store = create_test_store();
        let event = AuditEvent::TicketIssued {
            ticket_id: "t-7".to_string(),
            display_code: "C007".to_string(),
            service_type: ServiceType::Loan,
        };
        store.insert(&AuditRecord::from_event(Utc::now(), event.clone())).unwrap();

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results[0].data, event);
        assert_eq!(results[0].ticket_id.as_deref(), Some("t-7"));
        assert!(results[0].counter_id.is_none());
    }

    #[test]
    fn test_query_filters() {
        let store = create_test_store();

        store.insert(&service_started()).unwrap();
        store.insert(&ticket_called("t-1", 1, "teller-1")).unwrap();
        store.insert(&ticket_called("t-2", 2, "teller-2")).unwrap();
        store.insert(&ticket_called("t-3", 1, "teller-1")).unwrap();

        let by_type = AuditFilter::new().with_event_type("ticket_called");
        assert_eq!(store.query(&by_type).unwrap().len(), 3);

        let by_ticket = AuditFilter::new().with_ticket_id("t-2");
        let results = store.query(&by_ticket).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].counter_id, Some(2));

        let by_counter = AuditFilter::new().with_counter_id(1);
        assert_eq!(store.query(&by_counter).unwrap().len(), 2);

        let by_user = AuditFilter::new().with_user_id("teller-2");
        assert_eq!(store.query(&by_user).unwrap().len(), 1);
    }

    #[test]
    fn test_newest_first() {
        let store = create_test_store();
        let now = Utc::now();

        let mut older = ticket_called("t-old", 1, "teller-1");
        older.timestamp = now - Duration::minutes(5);
        store.insert(&older).unwrap();
        let mut newer = ticket_called("t-new", 1, "teller-1");
        newer.timestamp = now;
        store.insert(&newer).unwrap();

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results[0].ticket_id.as_deref(), Some("t-new"));
        assert_eq!(results[1].ticket_id.as_deref(), Some("t-old"));
    }

    #[test]
    fn test_query_with_time_range() {
        let store = create_test_store();

        let now = Utc::now();
        let mut old_record = service_started();
        old_record.timestamp = now - Duration::hours(2);
        store.insert(&old_record).unwrap();

        let mut new_record = service_started();
        new_record.timestamp = now;
        store.insert(&new_record).unwrap();

        let filter = AuditFilter::new().with_time_range(Some(now - Duration::hours(1)), None);
        assert_eq!(store.query(&filter).unwrap().len(), 1);

        let filter = AuditFilter::new().with_time_range(None, Some(now - Duration::hours(1)));
        assert_eq!(store.query(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_pagination_and_count() {
        let store = create_test_store();

        for i in 0..5 {
            store
                .insert(&ticket_called(&format!("t-{}", i), 1, "teller-1"))
                .unwrap();
        }
        store.insert(&service_started()).unwrap();

        let page = |offset| {
            store
                .query(&AuditFilter::new().with_limit(2).with_offset(offset))
                .unwrap()
                .len()
        };
        assert_eq!(page(0), 2);
        assert_eq!(page(2), 2);
        assert_eq!(page(4), 2);
        assert_eq!(page(6), 0);

        assert_eq!(store.count(&AuditFilter::new()).unwrap(), 6);
        let filter = AuditFilter::new().with_event_type("ticket_called");
        assert_eq!(store.count(&filter).unwrap(), 5);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("audit.db");

        {
            let store = SqliteAuditStore::new(&db_path).unwrap();
            store.insert(&service_started()).unwrap();
        }
        assert!(db_path.exists());

        let store = SqliteAuditStore::new(&db_path).unwrap();
        assert_eq!(store.query(&AuditFilter::new()).unwrap().len(), 1);
    }
}
