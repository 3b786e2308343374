use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use caresync_server::{
    create_app, routes::paths, verification::spawn_purge_task, CareSyncServer, ServerSettings,
};
use config_engine::ConfigEngine;
use logger_redacted::init_tracing;

/// CareSync HTTP Server
#[derive(Parser, Debug)]
#[command(name = "caresync-server")]
#[command(about = "Record acceptance and professional verification API")]
struct Args {
    /// Configuration file (YAML or TOML)
    #[arg(short, long, env = "CARESYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Server bind address (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings: ServerSettings = ConfigEngine::new()
        .with_optional_file(args.config.as_ref())
        .load()
        .context("Failed to load server configuration")?;
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if args.verbose {
        settings.logging.level = "debug".to_string();
    }

    let _log_guard = init_tracing(&settings.logging).context("Failed to initialize logging")?;

    let addr = settings.bind_address();
    info!(version = env!("CARGO_PKG_VERSION"), "{}", "Starting CareSync server".bright_cyan());

    let server = CareSyncServer::new(settings);
    let purge = spawn_purge_task(
        server.verification().store().clone(),
        Duration::from_secs(server.settings().verification.purge_interval_secs),
    );

    let app = create_app(server);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("{}", format!("Listening on http://{addr}").bright_green());
    info!("Health check: http://{addr}{}", paths::HEALTH);
    info!("Record sync:  http://{addr}{}", paths::SYNC);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    purge.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
