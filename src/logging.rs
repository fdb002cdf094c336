//! Logging setup.
//!
//! The dashboard owns the terminal, so TUI runs log to a timestamped file
//! under the data directory; everything else (CLI subcommands) logs to
//! stderr. `RUST_LOG` overrides the configured level either way.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

pub struct LoggingHandle {
    /// Flushes buffered log lines when dropped; hold it for the whole run.
    pub _guard: Option<WorkerGuard>,
    /// Where file logging landed, if it is on.
    pub log_file_path: Option<PathBuf>,
}

pub fn init_logging(config: &Config, is_tui_mode: bool, debug_override: bool) -> Result<LoggingHandle> {
    let level = if debug_override {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()));

    if !(is_tui_mode && config.logging.to_file) {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
        return Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        });
    }

    let logs_dir = config.logs_path();
    std::fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;
    let file_name = format!(
        "openkanban-{}.log",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
    );

    let appender = tracing_appender::rolling::never(&logs_dir, &file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false) // log files stay plain text
                .with_writer(writer),
        )
        .init();

    Ok(LoggingHandle {
        _guard: Some(guard),
        log_file_path: Some(logs_dir.join(file_name)),
    })
}
