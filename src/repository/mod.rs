//! Repository layer for SQLite persistence.

mod document;

pub use document::DocumentRepository;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;

/// Repository result type.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors raised at the data-access boundary.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid stored record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("content hash already stored: {0}")]
    DuplicateHash(String),
}

/// Open a connection with the pragmas used everywhere in this crate.
pub(crate) fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
