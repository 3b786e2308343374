use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::server::CareSyncServer;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
}

/// Health check handler; also the target of client connectivity probes
pub async fn health_check(State(server): State<CareSyncServer>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: server.uptime().as_secs(),
    })
}
