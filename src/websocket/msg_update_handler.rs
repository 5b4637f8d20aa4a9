use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::models::{ServerMessage, UserIdentity};
use crate::presence::gateway::BroadcastGateway;
use crate::presence::registry::ConnectionId;

/// Handle `document-update`
///
/// Pure relay: persistence happens on the authoritative update path, which
/// rebroadcasts through the bus and bridge on its own. The sender is
/// excluded here because its client already shows the edit; consumers must
/// still dedupe against the bridged copy.
pub async fn handle_update(
    document_id: i64,
    content: String,
    cursor_position: Value,
    connection_id: ConnectionId,
    user: &UserIdentity,
    gateway: &BroadcastGateway,
) {
    debug!("Document {} updated by {}", document_id, user.id);
    gateway
        .relay_to_room(
            document_id,
            connection_id,
            &ServerMessage::DocumentUpdated {
                content,
                cursor_position,
                user: user.clone(),
                timestamp: Utc::now().timestamp_millis(),
            },
        )
        .await;
}

/// Handle `cursor-position`
pub async fn handle_cursor(
    document_id: i64,
    position: Value,
    connection_id: ConnectionId,
    user: &UserIdentity,
    gateway: &BroadcastGateway,
) {
    gateway
        .relay_to_room(
            document_id,
            connection_id,
            &ServerMessage::CursorMoved {
                position,
                user: user.clone(),
                timestamp: Utc::now().timestamp_millis(),
            },
        )
        .await;
}

/// Handle `typing`
pub async fn handle_typing(
    document_id: i64,
    is_typing: bool,
    connection_id: ConnectionId,
    user: &UserIdentity,
    gateway: &BroadcastGateway,
) {
    gateway
        .relay_to_room(
            document_id,
            connection_id,
            &ServerMessage::UserTyping {
                user: user.clone(),
                is_typing,
                timestamp: Utc::now().timestamp_millis(),
            },
        )
        .await;
}
