//! Log setup for the CLI: a console layer and a plain-text file layer, each
//! fed through its own non-blocking writer thread.

use spawndex_core::{Config, Error, Result};
use std::fs::OpenOptions;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// The returned guards must be held until exit so queued lines are flushed.
pub fn init(config: &Config) -> Result<Vec<WorkerGuard>> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_filename)
        .map_err(|e| Error::FileWrite {
            path: config.log_filename.clone(),
            source: e,
        })?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(log_file);
    let (console_writer, console_guard) = tracing_appender::non_blocking(io::stderr());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(level_filter(&config.log_level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(console_writer)
        .with_ansi(config.fun_mode)
        .with_target(false)
        .with_filter(level_filter(&config.log_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(vec![file_guard, console_guard])
}

/// `RUST_LOG` when set, else the configured level
fn level_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Map a config level name ("INFO", "WARNING", "CRITICAL", ...) to a
/// tracing level directive.
fn level_directive(log_level: &str) -> String {
    match log_level.trim().to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "" => "info".to_string(),
        other => other.to_string(),
    }
}
