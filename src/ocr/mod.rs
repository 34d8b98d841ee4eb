//! OCR and text extraction module.
//!
//! The extraction engine is modeled as a capability: bytes in, text out.
//! Tesseract (system binary) is the production backend; tests substitute
//! their own implementations.

mod tesseract;

pub use tesseract::TesseractExtractor;

use thiserror::Error;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability interface for turning image bytes into plain text.
///
/// Implementations may block (model inference, external binaries);
/// callers run them under `spawn_blocking`.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image: &[u8]) -> Result<String, ExtractionError>;
}

/// Normalize extractor output: trailing whitespace stripped per line,
/// lines joined with newline, outer whitespace trimmed.
pub(crate) fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
