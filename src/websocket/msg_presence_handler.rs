use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{ServerMessage, UserIdentity};
use crate::presence::registry::ConnectionId;
use crate::AppState;

/// Handle `join-document`
///
/// The joiner is included in the notification so every member, new and
/// old, converges on the same active-user list.
pub async fn handle_join(
    document_id: i64,
    connection_id: ConnectionId,
    user: &UserIdentity,
    app_state: &Arc<AppState>,
) {
    let active_users = match app_state.registry.join(document_id, connection_id).await {
        Ok(active_users) => active_users,
        Err(e) => {
            warn!(
                "Join rejected for {} on document {}: {}",
                connection_id, document_id, e
            );
            return;
        }
    };
    info!("User {} joined document {}", user.id, document_id);
    app_state
        .gateway
        .notify_room(
            document_id,
            &ServerMessage::UserJoined {
                user: user.clone(),
                active_users,
            },
        )
        .await;
}

/// Handle `leave-document`
///
/// Leaving a room the connection never joined changes nothing and
/// notifies nobody.
pub async fn handle_leave(
    document_id: i64,
    connection_id: ConnectionId,
    user: &UserIdentity,
    app_state: &Arc<AppState>,
) {
    if let Some(remaining) = app_state.registry.leave(document_id, connection_id).await {
        info!("User {} left document {}", user.id, document_id);
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
}
