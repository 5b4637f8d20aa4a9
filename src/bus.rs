use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::models::BusEvent;

/// In-process stand-in for the external pub/sub transport.
///
/// Messages are raw JSON strings shaped as `{event, data}`; a subscription
/// behaves like a wildcard pattern and sees every published message. The
/// authoritative update path publishes here, and the bridge re-emits into
/// the broadcast gateway.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<String>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Publishing with no live subscribers is not an
    /// error; the message simply goes nowhere.
    pub fn publish(&self, event: &str, data: Value) {
        let envelope = BusEvent {
            event: event.to_string(),
            data,
        };
        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize bus event '{}': {}", envelope.event, e);
                return;
            }
        };
        if self.tx.send(payload).is_err() {
            debug!("No subscribers for bus event '{}'", envelope.event);
        }
    }

    /// Publish a raw payload without shaping it first. Exists so producers
    /// outside this process boundary (and tests) can put arbitrary bytes on
    /// the wire, which the bridge must survive.
    pub fn publish_raw(&self, payload: String) {
        let _ = self.tx.send(payload);
    }

    /// Wildcard subscription over everything published on the bus.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}
