//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Filter for the configured level; `RUST_LOG` takes precedence when set
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim().to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(Error::Config(format!(
            "Invalid log level '{}' (expected one of: {})",
            level,
            LEVELS.join(", ")
        )));
    }
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,adi_enrich={level},adi_common={level}"))))
}

/// Install the global subscriber: console always, plus an optional log file
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}
