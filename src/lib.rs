pub mod bridge;
pub mod bus;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod presence;
pub mod routes;
pub mod services;
pub mod websocket;

use std::sync::Arc;

use presence::gateway::BroadcastGateway;
use presence::registry::PresenceRegistry;
use services::document_service::DocumentService;

/// Shared state injected into every connection handler and route.
///
/// The presence registry is the only shared mutable resource of the relay;
/// it lives here rather than in a module-level global so tests can spin up
/// isolated instances.
pub struct AppState {
    pub registry: Arc<PresenceRegistry>,
    pub gateway: Arc<BroadcastGateway>,
    pub documents: Arc<DocumentService>,
}
