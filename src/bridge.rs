use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::models::BusEvent;
use crate::presence::gateway::BroadcastGateway;

/// Relay events from the external bus into the broadcast gateway.
///
/// The bridge has no sender-identity correlation with connected clients,
/// so bridged events fan out to every connection, unscoped. Malformed
/// payloads are logged and dropped; a dead subscription ends the bridge
/// but never the relay, which keeps serving direct traffic.
pub async fn run_bridge(
    mut subscription: broadcast::Receiver<String>,
    gateway: Arc<BroadcastGateway>,
) {
    info!("Event bridge subscribed to bus");
    loop {
        match subscription.recv().await {
            Ok(raw) => {
                let event: BusEvent = match serde_json::from_str(&raw) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Dropping malformed bus message: {}", e);
                        continue;
                    }
                };
                debug!("Bus event received: {}", event.event);
                gateway.broadcast_all(&event.event, &event.data).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event bridge lagged, {} bus messages skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("Event bus closed; continuing without bridged events");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::models::UserIdentity;
    use crate::presence::registry::PresenceRegistry;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    async fn relay_with_client() -> (
        EventBus,
        mpsc::UnboundedReceiver<String>,
        Arc<PresenceRegistry>,
    ) {
        let registry = Arc::new(PresenceRegistry::new());
        registry.start().await;
        let gateway = Arc::new(BroadcastGateway::new(registry.clone()));
        let bus = EventBus::new(8);
        tokio::spawn(run_bridge(bus.subscribe(), gateway));

        let (tx, rx) = mpsc::unbounded_channel();
        registry
            .register(Uuid::new_v4(), UserIdentity::guest(), tx)
            .await
            .unwrap();
        (bus, rx, registry)
    }

    #[tokio::test]
    async fn forwards_bus_events_with_their_name_verbatim() {
        let (bus, mut rx, _registry) = relay_with_client().await;
        bus.publish("collaborator.added", json!({"document_id": 7}));

        let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("bridged event should arrive")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "collaborator.added");
        assert_eq!(value["data"]["document_id"], 7);
    }

    #[tokio::test]
    async fn malformed_bus_messages_are_dropped_and_the_bridge_survives() {
        let (bus, mut rx, _registry) = relay_with_client().await;
        bus.publish_raw("{definitely not json".to_string());
        bus.publish_raw("[1, 2, 3]".to_string());
        bus.publish("document.updated", json!({"id": 5}));

        // Only the well-formed event comes through, proving the bridge
        // outlived the garbage before it
        let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("bridge should still be alive")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "document.updated");
        assert!(rx.try_recv().is_err());
    }
}
