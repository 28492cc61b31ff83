//! SqliteRepository - history table on a local SQLite database.
//!
//! # Implementation notes
//! - `rusqlite::Connection` is blocking, so every call runs in `spawn_blocking`
//! - A `Mutex` serializes access; the lock never crosses an `.await`
//! - Timestamps are stored as unix seconds in `fetch_timestamp`

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::domain::{Artifact, ArtifactId};
use crate::ports::{Repository, RepositoryError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        origin_url TEXT NOT NULL,
        filename TEXT NOT NULL,
        fetch_timestamp INTEGER NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT '',
        author_url TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_history_origin ON history(origin_url);
    CREATE INDEX IF NOT EXISTS idx_history_fetched ON history(fetch_timestamp);";

const COLUMNS: &str = "id, origin_url, filename, fetch_timestamp, title, author, author_url";

pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path`, including missing parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let open_error = |message: String| RepositoryError::Open {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| open_error(e.to_string()))?;
        }

        let fresh = !path.exists();
        let conn = Connection::open(path).map_err(|e| open_error(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| open_error(e.to_string()))?;
        if fresh {
            info!(path = %path.display(), "created history database");
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn in_memory() -> Result<Self, RepositoryError> {
        let open_error = |e: rusqlite::Error| RepositoryError::Open {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        };
        let conn = Connection::open_in_memory().map_err(open_error)?;
        conn.execute_batch(SCHEMA).map_err(open_error)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RepositoryError::Unavailable("connection lock poisoned".into()))?;
            f(&guard).map_err(|e| RepositoryError::Query {
                operation,
                message: e.to_string(),
            })
        })
        .await
        .map_err(|e| RepositoryError::Unavailable(format!("{operation}: {e}")))?
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Artifact> {
    let fetched_secs: i64 = row.get(3)?;
    Ok(Artifact {
        id: ArtifactId::new(row.get(0)?),
        origin: row.get(1)?,
        filename: row.get(2)?,
        fetched_at: DateTime::from_timestamp(fetched_secs, 0).unwrap_or_default(),
        title: row.get(4)?,
        author: row.get(5)?,
        author_url: row.get(6)?,
        bytes: Vec::new(),
    })
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn add(&self, artifact: &Artifact) -> Result<ArtifactId, RepositoryError> {
        let row = (
            artifact.origin.clone(),
            artifact.filename.clone(),
            artifact.fetched_at.timestamp(),
            artifact.title.clone(),
            artifact.author.clone(),
            artifact.author_url.clone(),
        );
        let id = self
            .with_conn("insert history", move |conn| {
                conn.execute(
                    "INSERT INTO history (origin_url, filename, fetch_timestamp, title, author, author_url)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![row.0, row.1, row.2, row.3, row.4, row.5],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        debug!(id, origin = %artifact.origin, "history row inserted");
        Ok(ArtifactId::new(id))
    }

    async fn list(&self) -> Result<Vec<Artifact>, RepositoryError> {
        self.with_conn("list history", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM history ORDER BY fetch_timestamp DESC, id DESC"
            ))?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect()
        })
        .await
    }

    async fn get(&self, id: ArtifactId) -> Result<Option<Artifact>, RepositoryError> {
        self.with_conn("get history row", move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM history WHERE id = ?1"),
                params![id.get()],
                map_row,
            )
            .optional()
        })
        .await
    }

    async fn exists(&self, origin: &str) -> Result<bool, RepositoryError> {
        let origin = origin.to_string();
        self.with_conn("lookup origin", move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM history WHERE origin_url = ?1)",
                params![origin],
                |row| row.get(0),
            )
        })
        .await
    }

    async fn clear_all(&self) -> Result<(), RepositoryError> {
        let removed = self
            .with_conn("clear history", |conn| conn.execute("DELETE FROM history", []))
            .await?;
        info!(removed, "history cleared");
        Ok(())
    }
}
