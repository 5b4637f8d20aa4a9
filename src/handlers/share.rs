use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::warn;

use crate::models::{Document, DocumentPatch, ErrorResponse, RelayError};
use crate::AppState;

#[derive(Deserialize)]
pub struct SharedUpdateRequest {
    pub content: String,
}

/// Resolve a share link and return the document it grants access to.
///
/// Never-existed, revoked and expired tokens all produce the same 404.
pub async fn get_shared_document(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Document>, (StatusCode, Json<ErrorResponse>)> {
    app_state
        .documents
        .get_by_share_token(&token)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Apply an anonymous edit through a share link with edit permission.
pub async fn update_shared_document(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(request): Json<SharedUpdateRequest>,
) -> Result<Json<Document>, (StatusCode, Json<ErrorResponse>)> {
    app_state
        .documents
        .update_by_share_token(
            &token,
            DocumentPatch {
                title: None,
                content: Some(request.content),
            },
        )
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(err: RelayError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
        RelayError::Forbidden => StatusCode::FORBIDDEN,
        RelayError::NotFoundOrExpired | RelayError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Share request failed: {}", err);
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: err.to_string(),
        }),
    )
}
