//! SQLite-backed target store.
//!
//! Each call opens its own connection to the database file, so the store is
//! just a path and can be cloned freely into blocking tasks. The `email`
//! column is `UNIQUE COLLATE NOCASE`; that constraint, not the pipeline's
//! own checks, is what finally guarantees uniqueness across concurrent runs.

use crate::store::{StoreError, TargetStore};
use common::model::target::{StoredTarget, TargetRecord};
use log::{debug, info};
use rusqlite::{params, Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS targets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    department TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

#[derive(Debug, Clone)]
pub struct SqliteTargetStore {
    path: PathBuf,
}

impl SqliteTargetStore {
    /// Opens (creating if needed) the database at `path` and makes sure the
    /// `targets` table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.connection()?.execute(CREATE_TABLE, [])?;
        info!("Target store ready at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Persisted targets ordered by creation, optionally limited to one
    /// department (compared case-insensitively).
    pub fn list(&self, department: Option<&str>) -> Result<Vec<StoredTarget>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, email, department, created_at FROM targets
             WHERE ?1 IS NULL OR department = ?1 COLLATE NOCASE
             ORDER BY created_at, rowid",
        )?;
        let targets = stmt
            .query_map(params![department], |row| {
                Ok(StoredTarget {
                    id: row.get(0)?,
                    record: TargetRecord {
                        name: row.get(1)?,
                        email: row.get(2)?,
                        department: row.get(3)?,
                    },
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    }
}

impl TargetStore for SqliteTargetStore {
    fn existing_emails(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT email FROM targets")?;
        let emails = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Loaded {} existing emails", emails.len());
        Ok(emails)
    }

    fn create_many(&self, records: &[TargetRecord]) -> Result<Vec<TargetRecord>, StoreError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO targets (id, name, email, department) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    record.name,
                    record.email,
                    record.department
                ])
                .map_err(into_store_error)?;
            }
        }
        // Dropping `tx` on any early return above rolls everything back.
        tx.commit()?;
        Ok(records.to_vec())
    }
}

fn into_store_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, message) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(message.unwrap_or_else(|| e.to_string()))
        }
        other => StoreError::Database(other),
    }
}
