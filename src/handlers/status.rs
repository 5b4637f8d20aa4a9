use std::sync::{Arc, Mutex, OnceLock};

use axum::{extract::State, Json};
use chrono::Utc;
use sysinfo::System;
use tracing::debug;

use crate::config;
use crate::models::StatusResponse;
use crate::AppState;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Service status endpoint: process health and current room count. This is
/// the whole administrative surface of the relay.
pub async fn status(State(app_state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let active_rooms = app_state.registry.room_count().await;

    let (cpu_usage, memory_used, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0),
        }
    };

    debug!("Status requested: {} active room(s)", active_rooms);
    Json(StatusResponse {
        status: "ok".to_string(),
        service: config::get_config().service_name.clone(),
        active_rooms,
        timestamp: Utc::now().to_rfc3339(),
        cpu_usage,
        memory_used,
        memory_total,
    })
}
