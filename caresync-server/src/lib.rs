//! CareSync Server - record acceptance and professional verification API
//!
//! Offline clients push their unsynced medical records to `POST /api/sync`
//! and mark whatever ids come back as synced. The verification endpoints
//! issue and check short-lived email codes for professional sign-up.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod settings;
pub mod verification;

// Re-export commonly used types
pub use error::*;
pub use server::CareSyncServer;
pub use settings::ServerSettings;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: CareSyncServer) -> Router {
    let cors = middleware::create_cors_layer(&server.settings().cors_origins);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
