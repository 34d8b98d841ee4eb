//! Document repository for SQLite persistence.
//!
//! Owns the record lifecycle: create, read, search, update, delete. The
//! `content_hash` UNIQUE constraint enforces the dedup invariant at the
//! store level, so a concurrent duplicate insert loses cleanly instead of
//! producing a second record.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_datetime, RepositoryError, Result};
use crate::models::{normalize_tag, normalize_tags, Document, DocumentUpdate, NewDocument};

/// SQLite-backed document repository.
pub struct DocumentRepository {
    db_path: PathBuf,
}

impl DocumentRepository {
    /// Create a new document repository, initializing the schema.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    /// Get the database path.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                recognized_text TEXT NOT NULL,
                content_hash TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_documents_created_at
                ON documents(created_at DESC);
            "#,
        )?;
        Ok(())
    }

    /// Insert a new document, assigning its id.
    ///
    /// Returns `DuplicateHash` when another record already holds the same
    /// `content_hash`; callers recover by looking up the existing record.
    pub fn insert(&self, new_doc: &NewDocument) -> Result<Document> {
        let conn = self.connect()?;
        let id = uuid::Uuid::new_v4().to_string();
        let tags = normalize_tags(&new_doc.tags);
        let tags_json = serde_json::to_string(&tags)?;
        let storage_path = new_doc.storage_path.to_string_lossy().into_owned();

        let result = conn.execute(
            "INSERT INTO documents
                (id, filename, storage_path, recognized_text, content_hash, created_at, tags)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                new_doc.filename,
                storage_path,
                new_doc.recognized_text,
                new_doc.content_hash,
                new_doc.created_at.to_rfc3339(),
                tags_json,
            ],
        );

        match result {
            Ok(_) => Ok(Document {
                id,
                filename: new_doc.filename.clone(),
                storage_path: new_doc.storage_path.clone(),
                recognized_text: new_doc.recognized_text.clone(),
                content_hash: new_doc.content_hash.clone(),
                created_at: new_doc.created_at,
                tags,
            }),
            Err(err) if is_hash_conflict(&err) => {
                Err(RepositoryError::DuplicateHash(new_doc.content_hash.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Get a document by id.
    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?")?;
        let doc = stmt.query_row(params![id], row_to_document).optional()?;
        Ok(doc)
    }

    /// Get a document by content hash.
    pub fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE content_hash = ?")?;
        let doc = stmt
            .query_row(params![content_hash], row_to_document)
            .optional()?;
        Ok(doc)
    }

    /// Get all documents, newest first.
    pub fn get_all(&self) -> Result<Vec<Document>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM documents ORDER BY created_at DESC")?;
        let docs = stmt
            .query_map([], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Case-insensitive substring search across recognized text, filename
    /// and tags. A record matching several fields appears once.
    ///
    /// Tags are matched per entry via `json_each`, so JSON punctuation in
    /// the stored column (`[`, `"`, `,`) never matches a query.
    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        let conn = self.connect()?;
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let mut stmt = conn.prepare(
            r#"SELECT * FROM documents
               WHERE lower(recognized_text) LIKE ?1 ESCAPE '\'
                  OR lower(filename) LIKE ?1 ESCAPE '\'
                  OR EXISTS (
                         SELECT 1 FROM json_each(documents.tags)
                         WHERE lower(json_each.value) LIKE ?1 ESCAPE '\'
                     )
               ORDER BY created_at DESC"#,
        )?;
        let docs = stmt
            .query_map(params![pattern], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn update(&self, id: &str, update: &DocumentUpdate) -> Result<Document> {
        let conn = self.connect()?;

        if !update.is_empty() {
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(text) = &update.recognized_text {
                sets.push("recognized_text = ?");
                values.push(Box::new(text.clone()));
            }
            if let Some(tags) = &update.tags {
                sets.push("tags = ?");
                values.push(Box::new(serde_json::to_string(&normalize_tags(tags))?));
            }
            values.push(Box::new(id.to_string()));

            let sql = format!("UPDATE documents SET {} WHERE id = ?", sets.join(", "));
            let value_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|v| v.as_ref()).collect();
            let changed = conn.execute(&sql, value_refs.as_slice())?;
            if changed == 0 {
                return Err(RepositoryError::NotFound(id.to_string()));
            }
        }

        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?")?;
        stmt.query_row(params![id], row_to_document)
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    /// Add a normalized tag to a document's tag set.
    ///
    /// Returns whether a change was made; `NotFound` when the document
    /// does not exist.
    pub fn add_tag(&self, id: &str, tag: &str) -> Result<bool> {
        let tag = normalize_tag(tag);
        self.mutate_tags(id, move |tags| {
            if tag.is_empty() || tags.contains(&tag) {
                false
            } else {
                tags.push(tag);
                true
            }
        })
    }

    /// Remove a normalized tag from a document's tag set. Symmetric to
    /// [`add_tag`](Self::add_tag).
    pub fn remove_tag(&self, id: &str, tag: &str) -> Result<bool> {
        let tag = normalize_tag(tag);
        self.mutate_tags(id, |tags| {
            let before = tags.len();
            tags.retain(|t| t != &tag);
            tags.len() != before
        })
    }

    fn mutate_tags<F>(&self, id: &str, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Vec<String>) -> bool,
    {
        let conn = self.connect()?;
        let tags_json: Option<String> = conn
            .query_row(
                "SELECT tags FROM documents WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let tags_json = tags_json.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        let mut tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

        if !mutate(&mut tags) {
            return Ok(false);
        }

        conn.execute(
            "UPDATE documents SET tags = ? WHERE id = ?",
            params![serde_json::to_string(&tags)?, id],
        )?;
        Ok(true)
    }

    /// Delete a document record. `NotFound` when the id does not exist.
    pub fn delete(&self, id: &str) -> Result<()> {
        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM documents WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn row_to_document(row: &Row) -> std::result::Result<Document, rusqlite::Error> {
    let created_at: String = row.get("created_at")?;
    let storage_path: String = row.get("storage_path")?;
    let tags_json: String = row.get("tags")?;

    Ok(Document {
        id: row.get("id")?,
        filename: row.get("filename")?,
        storage_path: PathBuf::from(storage_path),
        recognized_text: row.get("recognized_text")?,
        content_hash: row.get("content_hash")?,
        created_at: parse_datetime(&created_at),
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
    })
}

fn is_hash_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("content_hash")
    )
}

/// Escape LIKE wildcards so user queries match literally.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
