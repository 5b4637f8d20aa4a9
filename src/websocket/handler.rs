use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ClientMessage, ErrorResponse, ServerMessage, UserIdentity};
use crate::presence::registry::ConnectionId;
use crate::services::identity_service;
use crate::websocket::{msg_presence_handler, msg_update_handler};
use crate::AppState;

/// WebSocket handler
///
/// Identity is resolved from the handshake before the upgrade; a missing
/// or invalid credential degrades to the guest identity rather than
/// rejecting the connection.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    if !app_state.registry.is_running().await {
        let status = StatusCode::SERVICE_UNAVAILABLE;
        return (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: "Relay is not accepting connections".to_string(),
            }),
        )
            .into_response();
    }

    let token = identity_service::handshake_token(&headers, &query);
    let user = identity_service::resolve_identity(token.as_deref());
    info!("New WebSocket connection attempt by {} ({})", user.id, user.name);
    ws.on_upgrade(move |socket| handle_socket(socket, user, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, user: UserIdentity, app_state: Arc<AppState>) {
    // Unique per physical connection; two tabs of one user get two ids
    let connection_id = Uuid::new_v4();
    info!(
        "WebSocket connection established for user {} with connection_id {}",
        user.id, connection_id
    );

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    if let Err(e) = app_state
        .registry
        .register(connection_id, user.clone(), outbound_tx)
        .await
    {
        warn!("Rejecting connection {}: {}", connection_id, e);
        return;
    }

    let (mut sender, mut receiver) = socket.split();

    // Forward queued outbound frames to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Listen to the websocket for incoming messages; anything that is not
    // parsable text is dropped without taking the connection down
    let recv_state = app_state.clone();
    let recv_user = user.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(Message::Text(raw))) = receiver.next().await {
            let message: ClientMessage = match serde_json::from_str(&raw) {
                Ok(message) => message,
                Err(e) => {
                    warn!(
                        "Dropping malformed client message on {}: {}",
                        connection_id, e
                    );
                    continue;
                }
            };
            dispatch(message, connection_id, &recv_user, &recv_state).await;
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Cleanup runs here, after task teardown, so a disconnect triggered
    // mid-broadcast still sweeps every room the connection had joined.
    for (document_id, remaining) in app_state.registry.disconnect(connection_id).await {
        app_state
            .gateway
            .notify_room(
                document_id,
                &ServerMessage::UserLeft {
                    user: user.clone(),
                    active_users: remaining,
                },
            )
            .await;
    }
    info!("WebSocket connection terminated: {}", connection_id);
}

async fn dispatch(
    message: ClientMessage,
    connection_id: ConnectionId,
    user: &UserIdentity,
    app_state: &Arc<AppState>,
) {
    match message {
        ClientMessage::JoinDocument { document_id } => {
            msg_presence_handler::handle_join(document_id, connection_id, user, app_state).await;
        }
        ClientMessage::LeaveDocument { document_id } => {
            msg_presence_handler::handle_leave(document_id, connection_id, user, app_state).await;
        }
        ClientMessage::DocumentUpdate {
            document_id,
            content,
            cursor_position,
        } => {
            msg_update_handler::handle_update(
                document_id,
                content,
                cursor_position,
                connection_id,
                user,
                &app_state.gateway,
            )
            .await;
        }
        ClientMessage::CursorPosition {
            document_id,
            position,
        } => {
            msg_update_handler::handle_cursor(
                document_id,
                position,
                connection_id,
                user,
                &app_state.gateway,
            )
            .await;
        }
        ClientMessage::Typing {
            document_id,
            is_typing,
        } => {
            msg_update_handler::handle_typing(
                document_id,
                is_typing,
                connection_id,
                user,
                &app_state.gateway,
            )
            .await;
        }
    }
}
