pub mod gateway;
pub mod registry;

pub use gateway::BroadcastGateway;
pub use registry::{ConnectionId, PresenceRegistry};
