//! Service layer for Scanvault business logic.
//!
//! This module contains domain logic separated from UI concerns.
//! Services can be used by CLI, web server, or other interfaces.

mod ingest;
mod query;

pub use ingest::{IngestError, IngestOutcome, IngestService, ACCEPTED_IMAGE_TYPES};
pub use query::QueryService;
