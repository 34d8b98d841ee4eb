//! Document model for ingested scans.
//!
//! Each record describes one uniquely-fingerprinted upload: where its raw
//! bytes live on disk, the text recognized from them, and a set of tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// An ingested scan with its extracted text.
///
/// `content_hash` is unique across all records - byte-identical uploads
/// resolve to the same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, assigned by the repository on insert.
    pub id: String,
    /// Stored filename: ingestion timestamp prefix plus the original name.
    pub filename: String,
    /// Path to the stored blob.
    pub storage_path: PathBuf,
    /// Text recognized from the image. Manual correction supported.
    pub recognized_text: String,
    /// SHA-256 hash of the original upload bytes.
    pub content_hash: String,
    /// When the upload was ingested.
    pub created_at: DateTime<Utc>,
    /// Normalized tags (trimmed, lower-cased, no duplicates).
    pub tags: Vec<String>,
}

impl Document {
    /// Compute the SHA-256 fingerprint of upload content.
    ///
    /// Deterministic across restarts and platforms; zero bytes hash to the
    /// well-known empty-input digest rather than erroring.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}

/// Fields for a document about to be inserted. The repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub storage_path: PathBuf,
    pub recognized_text: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Partial update for a document. Only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    pub recognized_text: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl DocumentUpdate {
    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.recognized_text.is_none() && self.tags.is_none()
    }
}

/// Normalize a tag for storage or comparison.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Normalize a tag list, dropping empties and duplicates.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = normalize_tag(tag);
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}
