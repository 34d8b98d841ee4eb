//! Scanvault - scanned document ingestion, OCR and search system.
//!
//! Ingests scanned images, extracts their text with OCR, and makes the
//! resulting records searchable and taggable. Byte-identical uploads are
//! deduplicated by content hash, so the same scan is never stored twice.

pub mod cli;
pub mod config;
pub mod models;
pub mod ocr;
pub mod repository;
pub mod server;
pub mod services;
pub mod storage;
