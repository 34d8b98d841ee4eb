//! Router configuration for the web server.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.uploads_dir);

    Router::new()
        .route("/api/upload", post(handlers::upload_document))
        .route("/api/documents", get(handlers::list_documents))
        .route(
            "/api/documents/:doc_id",
            put(handlers::update_document).delete(handlers::delete_document),
        )
        .route(
            "/api/documents/:doc_id/tags",
            post(handlers::add_tag).delete(handlers::remove_tag),
        )
        .route("/api/search", get(handlers::search_documents))
        // Raw blob serving
        .nest_service("/uploads", uploads)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
