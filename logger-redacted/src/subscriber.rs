//! Global tracing subscriber setup

use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter '{directive}': {message}")]
    InvalidFilter { directive: String, message: String },

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Resolve the effective filter directive: `RUST_LOG` wins over config.
pub fn filter_directive(config: &LoggingConfig) -> String {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

fn env_filter(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directive).map_err(|e| LoggerError::InvalidFilter {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber
///
/// Keep the returned guard alive for the life of the process when file
/// logging is enabled, or buffered lines are lost on exit.
///
/// # Errors
///
/// Fails on an unparsable filter directive or if a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggerError> {
    let directive = filter_directive(config);
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stdout: BoxedLayer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(false)
            .with_filter(env_filter(&directive)?)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_filter(env_filter(&directive)?)
            .boxed(),
    };
    layers.push(stdout);

    let guard = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(env_filter(&directive)?)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(filter = %directive, format = ?config.format, "Tracing initialized");

    Ok(guard)
}
