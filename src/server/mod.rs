//! Web server exposing the ingestion and retrieval API.
//!
//! The transport layer is deliberately thin: each endpoint is one call into
//! the service layer. State is built once before serving and injected, so
//! tests can substitute a fake extraction backend.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::ocr::{TesseractExtractor, TextExtractor};
use crate::repository::DocumentRepository;
use crate::services::{IngestService, QueryService};
use crate::storage::UploadStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub query: Arc<QueryService>,
    pub uploads_dir: PathBuf,
}

impl AppState {
    /// Build state from settings with the production extraction backend.
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        settings.ensure_dirs()?;
        let repo = Arc::new(DocumentRepository::new(&settings.database_path())?);
        let store = Arc::new(UploadStore::new(settings.uploads_dir()));
        let extractor: Arc<dyn TextExtractor> =
            Arc::new(TesseractExtractor::new(settings.ocr_language.clone()));
        Ok(Self::with_parts(repo, store, extractor, settings.uploads_dir()))
    }

    /// Build state from pre-constructed parts (tests inject fakes here).
    pub fn with_parts(
        repo: Arc<DocumentRepository>,
        store: Arc<UploadStore>,
        extractor: Arc<dyn TextExtractor>,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(
                Arc::clone(&repo),
                Arc::clone(&store),
                extractor,
            )),
            query: Arc::new(QueryService::new(repo, store)),
            uploads_dir,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
