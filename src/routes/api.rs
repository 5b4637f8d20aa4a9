use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::{get_shared_document, status, update_shared_document};
use crate::websocket::websocket_handler;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/ws", get(websocket_handler))
        .route(
            "/share/:token",
            get(get_shared_document).put(update_shared_document),
        )
        .with_state(app_state)
}
