//! SQLite-backed `RecordStore`.
//!
//! The database lives at `~/.callboard/callboard.db` unless the config names
//! another path. Queries run on the blocking pool so the async views never
//! hold the connection across an await point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::StoreError;
use crate::store::{Query, RecordStore};

mod records;
mod sql;

pub use records::{NewAnalysis, NewCall};

#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        crate::migrations::run_migrations(&conn).map_err(StoreError::Migration)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// `~/.callboard/callboard.db`
    pub fn db_path() -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
        Ok(home.join(".callboard").join("callboard.db"))
    }

    /// Resolve a configured path, expanding a leading `~/`.
    pub fn resolve_path(configured: Option<&str>) -> Result<PathBuf, StoreError> {
        match configured {
            None => Self::db_path(),
            Some(raw) => match raw.strip_prefix("~/") {
                Some(rest) => {
                    let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
                    Ok(home.join(rest))
                }
                None => Ok(Path::new(raw).to_path_buf()),
            },
        }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn execute(&self, query: &Query) -> Result<Vec<serde_json::Value>, StoreError> {
        let compiled = sql::compile(query)?;
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            compiled.run(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("query task failed: {e}")))?
    }
}
