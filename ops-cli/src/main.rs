use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use caresync_cli::{commands, Cli, CliSettings, Command};
use config_engine::ConfigEngine;
use logger_redacted::init_tracing;
use record_sync::{
    spawn_probe, AutoSync, HttpHealthProbe, NetworkMonitor, NetworkStatus, SqliteRecordStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings: CliSettings = ConfigEngine::new()
        .with_optional_file(cli.config.as_ref())
        .load()
        .context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        settings.store.db_path = db;
    }
    if let Some(endpoint) = cli.endpoint {
        settings.sync.endpoint_url = endpoint;
    }
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }

    let _log_guard = init_tracing(&settings.logging).context("Failed to initialize logging")?;

    match cli.command {
        Command::Add(args) => {
            let store = open_store(&settings).await?;
            let record = commands::add(&store, args).await?;
            println!("{} {}", "Created".green(), record.id);
        }
        Command::List { unsynced, json } => {
            let store = open_store(&settings).await?;
            let records = commands::list(&store, unsynced).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No records");
            } else {
                for record in &records {
                    println!("{}", commands::format_record_line(record));
                }
            }
        }
        Command::Show { id } => {
            let store = open_store(&settings).await?;
            let record = commands::show(&store, &id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::SetStatus { id, status } => {
            let store = open_store(&settings).await?;
            let record = commands::set_status(&store, &id, &status).await?;
            println!("{} {}", record.id, commands::status_label(record.sync_status));
        }
        Command::Sync => {
            let reconciler = record_sync::connect(
                &settings.store,
                &settings.sync.transport(),
                settings.sync.reconciler(),
            )
            .await
            .context("Failed to open local store")?;
            let report = commands::sync_once(&reconciler).await;
            println!("{}", commands::format_report(&report));
        }
        Command::Watch { interval } => {
            let interval = interval.unwrap_or(settings.sync.probe_interval_secs).max(1);
            watch(&settings, Duration::from_secs(interval)).await?;
        }
    }

    Ok(())
}

async fn open_store(settings: &CliSettings) -> Result<SqliteRecordStore> {
    SqliteRecordStore::new(&settings.store)
        .await
        .with_context(|| format!("Failed to open local store at {}", settings.store.db_path))
}

async fn watch(settings: &CliSettings, interval: Duration) -> Result<()> {
    let reconciler = Arc::new(
        record_sync::connect(
            &settings.store,
            &settings.sync.transport(),
            settings.sync.reconciler(),
        )
        .await
        .context("Failed to open local store")?,
    );

    let health_url = settings.sync.health_url();
    let probe = HttpHealthProbe::new(health_url.clone(), Duration::from_secs(settings.sync.connect_timeout_secs))
        .context("Failed to build connectivity probe")?;

    let monitor = NetworkMonitor::new(NetworkStatus::Offline);
    let auto_sync = AutoSync::spawn(reconciler, &monitor);
    let prober = spawn_probe(monitor, Arc::new(probe), interval);

    println!(
        "{} probing {} every {}s (Ctrl+C to stop)",
        "Watching".bright_cyan(),
        health_url,
        interval.as_secs()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    prober.abort();
    auto_sync.shutdown().await;
    println!("Stopped");
    Ok(())
}
