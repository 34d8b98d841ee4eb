//! Blob storage for uploaded scan content on disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised when persisting or removing blobs.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A blob persisted to the uploads directory.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Generated filename (timestamp prefix plus sanitized original name).
    pub filename: String,
    /// Full path to the stored file.
    pub path: PathBuf,
}

/// Filesystem store for raw upload bytes.
pub struct UploadStore {
    uploads_dir: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at the given directory.
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Get the uploads directory path.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Persist upload bytes under a timestamp-prefixed name.
    ///
    /// The millisecond timestamp prefix keeps unrelated uploads with the
    /// same original filename from colliding.
    pub fn store(
        &self,
        content: &[u8],
        original_name: &str,
        ingested_at: DateTime<Utc>,
    ) -> Result<StoredBlob, StorageError> {
        let filename = format!(
            "{}_{}",
            ingested_at.format("%Y%m%d_%H%M%S%3f"),
            sanitize_filename(original_name)
        );

        fs::create_dir_all(&self.uploads_dir)?;
        let path = self.uploads_dir.join(&filename);
        fs::write(&path, content)?;

        Ok(StoredBlob { filename, path })
    }

    /// Remove a blob. A missing blob is not an error.
    pub fn delete(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sanitize a filename for safe storage.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Trim and limit length
    let trimmed = sanitized.trim().trim_matches('_');
    if trimmed.is_empty() {
        return "upload".to_string();
    }
    // Cap at 100 characters; slicing by bytes could split a multibyte char.
    match trimmed.char_indices().nth(100) {
        Some((cut, _)) => trimmed[..cut].to_string(),
        None => trimmed.to_string(),
    }
}
