use utoipa::OpenApi;
use crate::models::*;

/// Service status endpoint
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Process status and current room count", body = StatusResponse)
    )
)]
#[allow(dead_code)]
pub async fn status_doc() {}

/// Resolve a share link
#[utoipa::path(
    get,
    path = "/share/{token}",
    params(
        ("token" = String, Path, description = "Share token")
    ),
    responses(
        (status = 200, description = "The shared document"),
        (status = 404, description = "Token unknown, revoked or expired", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_shared_document_doc() {}

/// Update a document through a share link
#[utoipa::path(
    put,
    path = "/share/{token}",
    params(
        ("token" = String, Path, description = "Share token")
    ),
    responses(
        (status = 200, description = "The updated document"),
        (status = 403, description = "Share link does not grant edit access", body = ErrorResponse),
        (status = 404, description = "Token unknown, revoked or expired", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_shared_document_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        status_doc,
        get_shared_document_doc,
        update_shared_document_doc,
    ),
    components(
        schemas(StatusResponse, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
