//! Upload ingestion workflow.
//!
//! Per upload: validate the media type, fingerprint the bytes, short-circuit
//! on a known hash, persist the blob, extract text, insert the record.
//! Extraction is the dominant latency cost and runs on the blocking pool so
//! concurrent uploads never stall each other.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Document, NewDocument};
use crate::ocr::{ExtractionError, TextExtractor};
use crate::repository::{DocumentRepository, RepositoryError};
use crate::storage::{StorageError, UploadStore};

/// Content types accepted for upload.
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// Errors raised by the ingestion workflow.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("blob storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Outcome of an ingestion attempt.
#[derive(Debug)]
pub enum IngestOutcome {
    /// A new record was created.
    Created(Document),
    /// Byte-identical content was already stored; the existing record is
    /// returned unchanged.
    Duplicate(Document),
}

impl IngestOutcome {
    /// The record behind either outcome.
    pub fn document(&self) -> &Document {
        match self {
            IngestOutcome::Created(doc) | IngestOutcome::Duplicate(doc) => doc,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate(_))
    }
}

/// Orchestrates hashing, blob storage, extraction and record creation.
pub struct IngestService {
    repo: Arc<DocumentRepository>,
    store: Arc<UploadStore>,
    extractor: Arc<dyn TextExtractor>,
}

impl IngestService {
    pub fn new(
        repo: Arc<DocumentRepository>,
        store: Arc<UploadStore>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            repo,
            store,
            extractor,
        }
    }

    /// Ingest one upload.
    ///
    /// Re-uploading byte-identical content is idempotent: the existing
    /// record is returned, with no second blob write and no second
    /// extraction.
    pub async fn ingest(
        &self,
        content: Vec<u8>,
        content_type: &str,
        original_name: &str,
    ) -> Result<IngestOutcome, IngestError> {
        validate_media_type(&content, content_type)?;

        let content_hash = Document::compute_hash(&content);
        if let Some(existing) = self.repo.find_by_hash(&content_hash)? {
            info!(hash = %content_hash, id = %existing.id, "duplicate upload, returning existing record");
            return Ok(IngestOutcome::Duplicate(existing));
        }

        let ingested_at = Utc::now();
        let blob = self.store.store(&content, original_name, ingested_at)?;

        let extractor = Arc::clone(&self.extractor);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&content)).await?;

        let recognized_text = match extracted {
            Ok(text) => text,
            Err(err) => {
                // Failed attempts must not leave an orphaned blob behind.
                if let Err(cleanup) = self.store.delete(&blob.path) {
                    warn!(path = %blob.path.display(), error = %cleanup, "failed to remove blob after extraction failure");
                }
                return Err(err.into());
            }
        };

        let new_doc = NewDocument {
            filename: blob.filename.clone(),
            storage_path: blob.path.clone(),
            recognized_text,
            content_hash: content_hash.clone(),
            created_at: ingested_at,
            tags: vec![],
        };

        match self.repo.insert(&new_doc) {
            Ok(doc) => {
                info!(id = %doc.id, filename = %doc.filename, "document ingested");
                Ok(IngestOutcome::Created(doc))
            }
            Err(RepositoryError::DuplicateHash(_)) => {
                // Lost a concurrent race on the same content. The winner's
                // record stands; drop our blob and hand that record back.
                if let Err(cleanup) = self.store.delete(&blob.path) {
                    warn!(path = %blob.path.display(), error = %cleanup, "failed to remove blob after losing insert race");
                }
                let existing = self
                    .repo
                    .find_by_hash(&content_hash)?
                    .ok_or_else(|| RepositoryError::NotFound(content_hash.clone()))?;
                Ok(IngestOutcome::Duplicate(existing))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Reject uploads that are not PNG or JPEG.
///
/// Checks the declared content type, then sniffs the magic bytes so a
/// mislabeled file cannot sneak past.
fn validate_media_type(content: &[u8], declared: &str) -> Result<(), IngestError> {
    if !ACCEPTED_IMAGE_TYPES.contains(&declared) {
        return Err(IngestError::UnsupportedMediaType(declared.to_string()));
    }
    match infer::get(content) {
        Some(kind) if ACCEPTED_IMAGE_TYPES.contains(&kind.mime_type()) => Ok(()),
        Some(kind) => Err(IngestError::UnsupportedMediaType(
            kind.mime_type().to_string(),
        )),
        None => Err(IngestError::UnsupportedMediaType(declared.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Extractor returning canned text, counting invocations.
    struct FakeExtractor {
        text: &'static str,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl FakeExtractor {
        fn new(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                text,
                calls: std::sync::atomic::AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    impl TextExtractor for FakeExtractor {
        fn extract(&self, _image: &[u8]) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(self.text.to_string())
        }
    }

    /// Extractor that always fails.
    struct FailingExtractor;

    impl TextExtractor for FailingExtractor {
        fn extract(&self, _image: &[u8]) -> Result<String, ExtractionError> {
            Err(ExtractionError::ExtractionFailed("no decodable text".to_string()))
        }
    }

    fn png_bytes(suffix: &[u8]) -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(suffix);
        bytes
    }

    fn setup(
        extractor: Arc<dyn TextExtractor>,
    ) -> (IngestService, Arc<UploadStore>, Arc<DocumentRepository>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let repo = Arc::new(DocumentRepository::new(&dir.path().join("test.db")).unwrap());
        let store = Arc::new(UploadStore::new(dir.path().join("uploads")));
        let service = IngestService::new(Arc::clone(&repo), Arc::clone(&store), extractor);
        (service, store, repo, dir)
    }

    #[tokio::test]
    async fn test_ingest_creates_record() {
        let extractor = FakeExtractor::new("Total: 42 EUR");
        let (service, _store, repo, _dir) = setup(extractor.clone());

        let outcome = service
            .ingest(png_bytes(b"receipt"), "image/png", "receipt.png")
            .await
            .unwrap();

        let doc = outcome.document();
        assert!(!outcome.is_duplicate());
        assert_eq!(doc.recognized_text, "Total: 42 EUR");
        assert!(doc.tags.is_empty());
        assert!(doc.storage_path.exists());
        assert_eq!(repo.get_all().unwrap().len(), 1);
        assert_eq!(extractor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reupload_is_idempotent() {
        let extractor = FakeExtractor::new("text");
        let (service, store, repo, _dir) = setup(extractor.clone());

        let first = service
            .ingest(png_bytes(b"same"), "image/png", "a.png")
            .await
            .unwrap();
        let second = service
            .ingest(png_bytes(b"same"), "image/png", "b.png")
            .await
            .unwrap();

        assert!(second.is_duplicate());
        assert_eq!(second.document().id, first.document().id);
        assert_eq!(repo.get_all().unwrap().len(), 1);
        // No second extraction, no second blob.
        assert_eq!(extractor.call_count(), 1);
        let blobs = std::fs::read_dir(store.uploads_dir()).unwrap().count();
        assert_eq!(blobs, 1);
    }

    #[tokio::test]
    async fn test_unsupported_media_type_has_no_side_effects() {
        let extractor = FakeExtractor::new("text");
        let (service, store, repo, _dir) = setup(extractor.clone());

        let err = service
            .ingest(b"%PDF-1.4".to_vec(), "application/pdf", "doc.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::UnsupportedMediaType(_)));
        assert!(repo.get_all().unwrap().is_empty());
        assert!(!store.uploads_dir().exists());
        assert_eq!(extractor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mislabeled_content_rejected() {
        let extractor = FakeExtractor::new("text");
        let (service, _store, repo, _dir) = setup(extractor.clone());

        // PDF magic bytes behind an image content type.
        let err = service
            .ingest(b"%PDF-1.4 sneaky".to_vec(), "image/png", "fake.png")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::UnsupportedMediaType(_)));
        assert!(repo.get_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_cleans_up_blob() {
        let (service, store, repo, _dir) = setup(Arc::new(FailingExtractor));

        let err = service
            .ingest(png_bytes(b"scan"), "image/png", "scan.png")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Extraction(_)));
        assert!(repo.get_all().unwrap().is_empty());
        // The blob written before extraction must be gone again.
        let blobs = std::fs::read_dir(store.uploads_dir()).unwrap().count();
        assert_eq!(blobs, 0);
    }
}
