//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract via command-line for text extraction. This is the
//! traditional, widely-available OCR option.

use std::io::Write;
use std::process::Command;

use super::{normalize_text, ExtractionError, TextExtractor};

/// Text extractor backed by the system `tesseract` binary.
pub struct TesseractExtractor {
    /// Tesseract language setting.
    language: String,
}

impl TesseractExtractor {
    /// Create a new extractor with the given Tesseract language.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Run Tesseract on an image file.
    fn run_tesseract(&self, image_path: &std::path::Path) -> Result<String, ExtractionError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(ExtractionError::ExtractionFailed(format!(
                        "tesseract failed: {}",
                        stderr
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                ExtractionError::ToolNotFound(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ),
            ),
            Err(e) => Err(ExtractionError::Io(e)),
        }
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image: &[u8]) -> Result<String, ExtractionError> {
        // Tesseract reads from disk; stage the bytes in a temp file.
        let mut file = tempfile::Builder::new()
            .prefix("scanvault-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(image)?;
        file.flush()?;

        let raw = self.run_tesseract(file.path())?;
        Ok(normalize_text(&raw))
    }
}
