//! Structured logging with `tracing`.
//!
//! This module provides:
//! - [`Logger`], the collaborator the relay client reports user-facing
//!   lines through (connection state, forwarded requests, failures)
//! - [`TracingLogger`], the default implementation that emits `tracing` events
//! - [`init_subscriber`] for setting up the global `tracing` subscriber
//! - [`test_utils`] for capturing log output in tests
//!
//! Library internals log diagnostics directly through `tracing` macros;
//! only the lines a user of the client is expected to read go through
//! [`Logger`], so that embedders can redirect them.

pub mod test_utils;

pub use test_utils::{CapturedLogs, RecordingLogger, capture_logs};

use std::error::Error;
use std::sync::Arc;

/// Target used for events emitted by [`TracingLogger`].
pub const LOG_TARGET: &str = "hookline";

/// Sink for user-facing client log lines.
pub trait Logger: Send + Sync {
    /// Informational line.
    fn info(&self, message: &str);

    /// Failure line, with the underlying error when there is one.
    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>);
}

/// Default [`Logger`] backed by `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: LOG_TARGET, "{message}");
    }

    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(err) => tracing::error!(target: LOG_TARGET, error = %err, "{message}"),
            None => tracing::error!(target: LOG_TARGET, "{message}"),
        }
    }
}

/// Shared handle to the default logger.
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
