use axum::{
    routing::{get, post},
    Router,
};

use crate::{
    handlers::{health, sync, verification},
    server::CareSyncServer,
};

pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const SYNC: &str = "/api/sync";
    /// Short alias for older clients
    pub const SYNC_ALIAS: &str = "/sync";
    pub const SEND_VERIFICATION: &str = "/api/professional/send-verification";
    pub const VERIFY: &str = "/api/professional/verify";
}

/// Create health check routes
pub fn health_routes() -> Router<CareSyncServer> {
    Router::new().route(paths::HEALTH, get(health::health_check))
}

/// Create the record acceptance routes
pub fn sync_routes() -> Router<CareSyncServer> {
    Router::new()
        .route(
            paths::SYNC,
            post(sync::accept_records).fallback(sync::method_not_allowed),
        )
        .route(
            paths::SYNC_ALIAS,
            post(sync::accept_records).fallback(sync::method_not_allowed),
        )
}

/// Create professional verification routes
pub fn verification_routes() -> Router<CareSyncServer> {
    Router::new()
        .route(paths::SEND_VERIFICATION, post(verification::send_verification))
        .route(paths::VERIFY, post(verification::verify_code))
}

pub fn create_routes() -> Router<CareSyncServer> {
    Router::new()
        .merge(health_routes())
        .merge(sync_routes())
        .merge(verification_routes())
}
