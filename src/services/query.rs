//! Listing, search, tagging and deletion over stored documents.

use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{Document, DocumentUpdate};
use crate::repository::{DocumentRepository, RepositoryError, Result};
use crate::storage::UploadStore;

/// Thin composition over the repository and blob store.
pub struct QueryService {
    repo: Arc<DocumentRepository>,
    store: Arc<UploadStore>,
}

impl QueryService {
    pub fn new(repo: Arc<DocumentRepository>, store: Arc<UploadStore>) -> Self {
        Self { repo, store }
    }

    /// All documents, newest first.
    pub fn list_all(&self) -> Result<Vec<Document>> {
        self.repo.get_all()
    }

    /// Case-insensitive substring search across text, filename and tags.
    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        self.repo.search(query)
    }

    /// Apply a partial update; only supplied fields change.
    pub fn update_fields(&self, id: &str, update: &DocumentUpdate) -> Result<Document> {
        self.repo.update(id, update)
    }

    /// Add a tag. Returns whether the tag set changed.
    pub fn add_tag(&self, id: &str, tag: &str) -> Result<bool> {
        self.repo.add_tag(id, tag)
    }

    /// Remove a tag. Returns whether the tag set changed.
    pub fn remove_tag(&self, id: &str, tag: &str) -> Result<bool> {
        self.repo.remove_tag(id, tag)
    }

    /// Delete a document and its blob.
    ///
    /// Best-effort two-step: locate the record, remove the blob (an
    /// already-missing blob is tolerated, other blob errors are logged and
    /// do not block the metadata delete), then remove the record.
    pub fn delete_document(&self, id: &str) -> Result<()> {
        let doc = self
            .repo
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if let Err(err) = self.store.delete(&doc.storage_path) {
            warn!(id = %id, error = %err, "blob removal failed, deleting metadata anyway");
        }

        self.repo.delete(id)?;
        info!(id = %id, filename = %doc.filename, "document deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::tempdir;

    use crate::models::NewDocument;

    fn setup() -> (QueryService, Arc<DocumentRepository>, Arc<UploadStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let repo = Arc::new(DocumentRepository::new(&dir.path().join("test.db")).unwrap());
        let store = Arc::new(UploadStore::new(dir.path().join("uploads")));
        let service = QueryService::new(Arc::clone(&repo), Arc::clone(&store));
        (service, repo, store, dir)
    }

    fn insert_with_blob(
        repo: &DocumentRepository,
        store: &UploadStore,
        name: &str,
        content: &[u8],
    ) -> Document {
        let now = Utc::now();
        let blob = store.store(content, name, now).unwrap();
        repo.insert(&NewDocument {
            filename: blob.filename,
            storage_path: blob.path,
            recognized_text: "text".to_string(),
            content_hash: Document::compute_hash(content),
            created_at: now,
            tags: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_delete_removes_blob_and_record() {
        let (service, repo, store, _dir) = setup();
        let doc = insert_with_blob(&repo, &store, "a.png", b"bytes");
        let blob_path = doc.storage_path.clone();
        assert!(blob_path.exists());

        service.delete_document(&doc.id).unwrap();

        assert!(!blob_path.exists());
        assert!(repo.get(&doc.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (service, _repo, _store, _dir) = setup();
        assert!(matches!(
            service.delete_document("no-such-id").unwrap_err(),
            RepositoryError::NotFound(_)
        ));
    }

    #[test]
    fn test_double_delete_is_not_found_without_side_effects() {
        let (service, repo, store, _dir) = setup();
        let doc = insert_with_blob(&repo, &store, "a.png", b"bytes");
        let other = insert_with_blob(&repo, &store, "b.png", b"other");

        service.delete_document(&doc.id).unwrap();
        assert!(matches!(
            service.delete_document(&doc.id).unwrap_err(),
            RepositoryError::NotFound(_)
        ));

        // The unrelated record is untouched.
        assert!(repo.get(&other.id).unwrap().is_some());
        assert!(other.storage_path.exists());
    }

    #[test]
    fn test_delete_tolerates_missing_blob() {
        let (service, repo, store, _dir) = setup();
        let doc = insert_with_blob(&repo, &store, "a.png", b"bytes");
        std::fs::remove_file(&doc.storage_path).unwrap();

        service.delete_document(&doc.id).unwrap();
        assert!(repo.get(&doc.id).unwrap().is_none());
    }

    #[test]
    fn test_update_and_search_passthrough() {
        let (service, repo, store, _dir) = setup();
        let doc = insert_with_blob(&repo, &store, "scan.png", b"bytes");

        service.add_tag(&doc.id, " Finance ").unwrap();
        let hits = service.search("finance").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tags, vec!["finance"]);

        let updated = service
            .update_fields(
                &doc.id,
                &DocumentUpdate {
                    recognized_text: Some("corrected".to_string()),
                    ..DocumentUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.recognized_text, "corrected");
        assert_eq!(updated.tags, vec!["finance"]);
    }
}
