// src/logging.rs

//! Logging setup for `reloadtrack` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log filter:
//! 1. explicit filter string passed by the hosting application (if provided)
//! 2. `RELOADTRACK_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that the hosting application's stdout stays
//! untouched.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup; the hosting application may instead install
/// its own subscriber, in which case this function should not be called.
pub fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_env("RELOADTRACK_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
