use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::models::ServerMessage;
use crate::presence::registry::{ConnectionId, OutboundSender, PresenceRegistry};

/// Routes relay messages to the right set of outbound queues.
///
/// Frames are serialized once and fanned out; dropped receivers (a
/// disconnect racing a broadcast) are ignored. Per sender-room FIFO holds
/// because each connection dispatches its inbound messages sequentially
/// and every recipient queue preserves insertion order.
pub struct BroadcastGateway {
    registry: Arc<PresenceRegistry>,
}

impl BroadcastGateway {
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// Relay to everyone in the room except the sender, whose client
    /// already reflects its own optimistic state.
    pub async fn relay_to_room(
        &self,
        document_id: i64,
        sender_id: ConnectionId,
        message: &ServerMessage,
    ) {
        self.send_to(
            self.registry.room_senders(document_id, Some(sender_id)).await,
            message,
        );
    }

    /// Presence changes go to the entire room, the affected member included.
    pub async fn notify_room(&self, document_id: i64, message: &ServerMessage) {
        self.send_to(self.registry.room_senders(document_id, None).await, message);
    }

    /// Bridged external events carry no sender correlation and no room
    /// scope; they reach every connection and the event name is forwarded
    /// verbatim. Clients are expected to filter and dedupe.
    pub async fn broadcast_all(&self, event: &str, data: &Value) {
        let frame = serde_json::json!({ "type": event, "data": data }).to_string();
        for sender in self.registry.all_senders().await {
            let _ = sender.send(frame.clone());
        }
    }

    fn send_to(&self, senders: Vec<OutboundSender>, message: &ServerMessage) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize outbound message: {}", e);
                return;
            }
        };
        for sender in senders {
            let _ = sender.send(frame.clone());
        }
    }
}
