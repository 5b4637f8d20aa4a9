use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for the service status endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub active_rooms: usize,
    pub timestamp: String,
    pub cpu_usage: f32,
    pub memory_used: u64,
    pub memory_total: u64,
}
