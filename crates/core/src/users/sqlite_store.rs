//! SQLite-backed user directory.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CreateProfileRequest, Profile, ProfileWithRoles, Role, UserError, UserStore};

/// SQLite-backed profile and role store.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    /// Create a new SQLite user store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, UserError> {
        let conn = Connection::open(path).map_err(|e| UserError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite user store (useful for testing).
    pub fn in_memory() -> Result<Self, UserError> {
        let conn = Connection::open_in_memory().map_err(|e| UserError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), UserError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_profiles_created_at ON profiles(created_at);

            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, role)
            );
            "#,
        )
        .map_err(|e| UserError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        let created_at_str: String = row.get(3)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(Profile {
            id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            created_at,
        })
    }

    fn find_profile(conn: &Connection, user_id: &str) -> Result<Option<Profile>, UserError> {
        conn.query_row(
            "SELECT id, user_id, email, created_at FROM profiles WHERE user_id = ?",
            params![user_id],
            Self::row_to_profile,
        )
        .optional()
        .map_err(|e| UserError::Database(e.to_string()))
    }
}

impl UserStore for SqliteUserStore {
    fn create_profile(&self, request: &CreateProfileRequest) -> Result<Profile, UserError> {
        let conn = self.lock();

        if Self::find_profile(&conn, &request.user_id)?.is_some() {
            return Err(UserError::AlreadyExists(request.user_id.clone()));
        }

        let profile = Profile {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            email: request.email.clone(),
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO profiles (id, user_id, email, created_at) VALUES (?, ?, ?, ?)",
            params![
                profile.id,
                profile.user_id,
                profile.email,
                // Fixed-width so ORDER BY created_at sorts chronologically.
                profile.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )
        .map_err(|e| UserError::Database(e.to_string()))?;

        Ok(profile)
    }

    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, UserError> {
        let conn = self.lock();
        Self::find_profile(&conn, user_id)
    }

    fn list_profiles(&self) -> Result<Vec<ProfileWithRoles>, UserError> {
        let conn = self.lock();

        let mut stmt = conn
            .prepare(
                "SELECT p.id, p.user_id, p.email, p.created_at,
                        EXISTS (SELECT 1 FROM user_roles r WHERE r.user_id = p.user_id AND r.role = ?)
                 FROM profiles p
                 ORDER BY p.created_at DESC, p.rowid DESC",
            )
            .map_err(|e| UserError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![Role::Admin.as_str()], |row| {
                Ok(ProfileWithRoles {
                    profile: Self::row_to_profile(row)?,
                    is_admin: row.get(4)?,
                })
            })
            .map_err(|e| UserError::Database(e.to_string()))?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row.map_err(|e| UserError::Database(e.to_string()))?);
        }
        Ok(profiles)
    }

    fn delete_profile(&self, user_id: &str) -> Result<Profile, UserError> {
        let mut conn = self.lock();

        let profile = Self::find_profile(&conn, user_id)?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| UserError::Database(e.to_string()))?;
        tx.execute("DELETE FROM user_roles WHERE user_id = ?", params![user_id])
            .map_err(|e| UserError::Database(e.to_string()))?;
        tx.execute("DELETE FROM profiles WHERE user_id = ?", params![user_id])
            .map_err(|e| UserError::Database(e.to_string()))?;
        tx.commit()
            .map_err(|e| UserError::Database(e.to_string()))?;

        Ok(profile)
    }

    fn grant_role(&self, user_id: &str, role: Role) -> Result<bool, UserError> {
        let conn = self.lock();

        if Self::find_profile(&conn, user_id)?.is_none() {
            return Err(UserError::NotFound(user_id.to_string()));
        }

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role, created_at) VALUES (?, ?, ?)",
                params![user_id, role.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(|e| UserError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    fn revoke_role(&self, user_id: &str, role: Role) -> Result<bool, UserError> {
        let conn = self.lock();

        let deleted = conn
            .execute(
                "DELETE FROM user_roles WHERE user_id = ? AND role = ?",
                params![user_id, role.as_str()],
            )
            .map_err(|e| UserError::Database(e.to_string()))?;

        Ok(deleted > 0)
    }

    fn has_role(&self, user_id: &str, role: Role) -> Result<bool, UserError> {
        let conn = self.lock();

        conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = ? AND role = ?)",
            params![user_id, role.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| UserError::Database(e.to_string()))
    }
}
