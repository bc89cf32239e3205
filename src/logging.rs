//! Logging setup
//!
//! Installs the global `tracing` subscriber: human-readable (or JSON) output on
//! stdout, plus an optional daily-rolling log file written through a
//! non-blocking appender.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "voicerelay.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    debug: bool,
    json: bool,
    log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
            json: false,
            log_dir: None,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Debug mode forces `debug` level for this crate regardless of `level`
    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    /// Filter directive used when `RUST_LOG` is not set
    fn directive(&self) -> String {
        if self.debug {
            format!("{},voicerelay=debug", self.level)
        } else {
            self.level.clone()
        }
    }
}

/// Subscriber for the window before `init_logging`, while configuration is
/// still being loaded. Shows warnings, or debug events when `debug` is set.
pub fn bootstrap_subscriber<W>(debug: bool, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .finish()
}

/// Install the global subscriber.
///
/// The returned guard must be held for the life of the process when file
/// logging is enabled, otherwise buffered lines are lost.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directive()))
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let plain_layer = (!config.json).then(|| fmt::layer().with_target(config.debug));
    let json_layer = config.json.then(|| fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(dir) = &config.log_dir {
        tracing::info!("Writing logs to {}", dir.display());
    }

    Ok(guard)
}
