//! Tracing initialization for the Nano Banana MCP server.
//!
//! Logs go to **stderr**: with the stdio transport, stdout carries the MCP
//! protocol stream and must not be mixed with log lines.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls the log level and filtering. Examples:
//!   - `RUST_LOG=debug` - Enable debug logging for all modules
//!   - `RUST_LOG=nanobanana_mcp=debug` - Enable debug for the server crate
//!   - `RUST_LOG=warn,nanobanana_mcp_common=debug` - Warn by default, debug for common
//!
//! # Usage
//!
//! ```no_run
//! use nanobanana_mcp_common::tracing::init_tracing;
//!
//! init_tracing();
//! tracing::info!("Application started");
//! ```

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the env filter, falling back to `default_level` when `RUST_LOG` is
/// unset or invalid.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Try to install the global subscriber with the given default level.
///
/// Returns `Err(())` if a global subscriber was already set.
pub fn try_init_tracing_with_default(default_level: &str) -> Result<(), ()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt_layer)
        .try_init()
        .map_err(|_| ())
}

/// Initialize tracing with `RUST_LOG` filtering (default `info`).
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_tracing() {
    if try_init_tracing_with_default(DEFAULT_LOG_LEVEL).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Try to initialize tracing, returning an error if already initialized.
pub fn try_init_tracing() -> Result<(), ()> {
    try_init_tracing_with_default(DEFAULT_LOG_LEVEL)
}
