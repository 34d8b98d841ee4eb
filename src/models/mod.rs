//! Data models for Scanvault.

mod document;

pub use document::{normalize_tag, normalize_tags, Document, DocumentUpdate, NewDocument};
