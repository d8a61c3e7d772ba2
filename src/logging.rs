//! Diagnostic log channel
//!
//! Everything developer-facing (status codes, transport errors) goes
//! through `tracing`. The TUI owns the terminal, so events are written to a
//! daily rolling file under ~/.local/state/hookchat/logs/.

use anyhow::Result;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config;

const LOG_ENV: &str = "HOOKCHAT_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the file subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init() -> Result<WorkerGuard> {
    let dir = config::state_dir()?.join("logs");
    fs::create_dir_all(&dir)?;

    let writer = tracing_appender::rolling::daily(&dir, "hookchat.log");
    let (nb, guard) = tracing_appender::non_blocking(writer);

    let _ = fmt()
        .with_env_filter(filter())
        .with_writer(nb)
        .with_ansi(false)
        .try_init();

    Ok(guard)
}

/// Stderr subscriber for headless binaries (the stub webhook)
pub fn init_stderr() {
    let _ = fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .try_init();
}
