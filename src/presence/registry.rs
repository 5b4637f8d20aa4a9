use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Participant, RelayError, UserIdentity};

pub type ConnectionId = Uuid;

/// Outbound frames are serialized once and queued per connection; an
/// unbounded queue means a slow client buffers without stalling delivery
/// to anyone else.
pub type OutboundSender = mpsc::UnboundedSender<String>;

struct ConnectionEntry {
    identity: UserIdentity,
    sender: OutboundSender,
}

/// Per-document set of connected participants, plus the connection table
/// backing unscoped broadcast.
///
/// One service instance is injected into the connection handlers; all
/// mutation goes through a single `RwLock`, which is the mutual exclusion
/// the room invariant requires. Rooms are created lazily on first join and
/// retained when they empty out.
pub struct PresenceRegistry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    running: bool,
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<i64, HashMap<ConnectionId, Participant>>,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub async fn start(&self) {
        let mut inner = self.inner.write().await;
        inner.running = true;
        info!("Presence registry started");
    }

    /// Stop accepting connections and drop all presence state. Dropping
    /// the outbound senders closes every connection's forwarder.
    pub async fn stop(&self) {
        let mut inner = self.inner.write().await;
        inner.running = false;
        inner.connections.clear();
        inner.rooms.clear();
        info!("Presence registry stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.read().await.running
    }

    /// Attach a new connection's identity and outbound queue.
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        identity: UserIdentity,
        sender: OutboundSender,
    ) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        if !inner.running {
            return Err(RelayError::RegistryStopped);
        }
        inner
            .connections
            .insert(connection_id, ConnectionEntry { identity, sender });
        Ok(())
    }

    /// Add a connection to a room, idempotently by connection id, and
    /// return the room's full participant list including the joiner.
    pub async fn join(
        &self,
        document_id: i64,
        connection_id: ConnectionId,
    ) -> Result<Vec<Participant>, RelayError> {
        let mut inner = self.inner.write().await;
        if !inner.running {
            return Err(RelayError::RegistryStopped);
        }
        let identity = inner
            .connections
            .get(&connection_id)
            .map(|entry| entry.identity.clone())
            .ok_or(RelayError::UnknownConnection)?;
        let members = inner.rooms.entry(document_id).or_default();
        members.insert(
            connection_id,
            Participant {
                id: identity.id,
                name: identity.name,
                connection_id,
            },
        );
        Ok(members.values().cloned().collect())
    }

    /// Remove one connection from one room. `None` means it was not a
    /// member and nothing changed; `Some` carries the remaining list.
    pub async fn leave(
        &self,
        document_id: i64,
        connection_id: ConnectionId,
    ) -> Option<Vec<Participant>> {
        let mut inner = self.inner.write().await;
        let members = inner.rooms.get_mut(&document_id)?;
        members.remove(&connection_id)?;
        Some(members.values().cloned().collect())
    }

    /// Remove a dropped connection from every room it is still part of.
    ///
    /// Returns the affected rooms with their remaining participant lists.
    /// Idempotent: rooms already left (or a repeated call) simply do not
    /// show up in the result.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Vec<(i64, Vec<Participant>)> {
        let mut inner = self.inner.write().await;
        inner.connections.remove(&connection_id);
        let mut affected = Vec::new();
        for (document_id, members) in inner.rooms.iter_mut() {
            if members.remove(&connection_id).is_some() {
                affected.push((*document_id, members.values().cloned().collect()));
            }
        }
        debug!(
            "Connection {} disconnected from {} room(s)",
            connection_id,
            affected.len()
        );
        affected
    }

    /// Rooms ever created, empty ones included
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    /// Outbound queues of a room's members, optionally excluding a sender.
    pub async fn room_senders(
        &self,
        document_id: i64,
        exclude: Option<ConnectionId>,
    ) -> Vec<OutboundSender> {
        let inner = self.inner.read().await;
        match inner.rooms.get(&document_id) {
            Some(members) => members
                .keys()
                .filter(|id| Some(**id) != exclude)
                .filter_map(|id| inner.connections.get(id).map(|entry| entry.sender.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Outbound queues of every connection, roomed or not.
    pub async fn all_senders(&self) -> Vec<OutboundSender> {
        let inner = self.inner.read().await;
        inner
            .connections
            .values()
            .map(|entry| entry.sender.clone())
            .collect()
    }
}
