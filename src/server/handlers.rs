//! HTTP request handlers for the web server.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::models::{normalize_tag, DocumentUpdate};
use crate::repository::RepositoryError;
use crate::services::{IngestError, IngestOutcome};

/// Error response carrying a `detail` message; internal failures are logged
/// and mapped to a generic body so storage paths never leak to callers.
pub enum ApiError {
    BadRequest(String),
    UnsupportedMediaType(String),
    NotFound(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::UnsupportedMediaType(mime) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Only PNG and JPEG uploads are accepted (got {mime})"),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Document not found".to_string()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal processing failure".to_string(),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedMediaType(mime) => ApiError::UnsupportedMediaType(mime),
            other => {
                tracing::error!(error = %other, "ingestion failed");
                ApiError::Internal
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ApiError::NotFound(id),
            other => {
                tracing::error!(error = %other, "repository operation failed");
                ApiError::Internal
            }
        }
    }
}

/// Upload a scan. Duplicates return the existing record with 200; fresh
/// uploads return 201.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let outcome = state
            .ingest
            .ingest(content.to_vec(), &content_type, &original_name)
            .await?;

        let response = match outcome {
            IngestOutcome::Created(doc) => (
                StatusCode::CREATED,
                Json(json!({ "message": "File uploaded successfully", "document": doc })),
            ),
            IngestOutcome::Duplicate(doc) => (
                StatusCode::OK,
                Json(json!({ "message": "File already exists", "document": doc })),
            ),
        };
        return Ok(response.into_response());
    }

    Err(ApiError::BadRequest("Missing 'file' field".to_string()))
}

/// List all documents, newest first.
pub async fn list_documents(State(state): State<AppState>) -> Result<Response, ApiError> {
    let docs = state.query.list_all()?;
    Ok(Json(docs).into_response())
}

#[derive(Deserialize)]
pub struct SearchParams {
    q: String,
}

/// Search across recognized text, filename and tags.
pub async fn search_documents(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let docs = state.query.search(&params.q)?;
    Ok(Json(docs).into_response())
}

/// Partial update: only supplied fields change.
pub async fn update_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(update): Json<DocumentUpdate>,
) -> Result<Response, ApiError> {
    let doc = state.query.update_fields(&doc_id, &update)?;
    Ok(Json(doc).into_response())
}

/// Delete a document and its stored file.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Response, ApiError> {
    state.query.delete_document(&doc_id)?;
    Ok(Json(json!({ "message": "Deleted successfully" })).into_response())
}

#[derive(Deserialize)]
pub struct TagRequest {
    tag: String,
}

/// Add a tag to a document's tag set.
pub async fn add_tag(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(request): Json<TagRequest>,
) -> Result<Response, ApiError> {
    if normalize_tag(&request.tag).is_empty() {
        return Err(ApiError::BadRequest("Tag cannot be empty".to_string()));
    }

    let applied = state.query.add_tag(&doc_id, &request.tag)?;
    let message = if applied { "Tag added" } else { "Tag already present" };
    Ok(Json(json!({ "message": message })).into_response())
}

/// Remove a tag from a document's tag set.
pub async fn remove_tag(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Json(request): Json<TagRequest>,
) -> Result<Response, ApiError> {
    let applied = state.query.remove_tag(&doc_id, &request.tag)?;
    let message = if applied { "Tag removed" } else { "Tag not present" };
    Ok(Json(json!({ "message": message })).into_response())
}
