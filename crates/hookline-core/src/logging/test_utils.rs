//! Test utilities for capturing log output.
//!
//! - [`capture_logs`] installs a thread-local subscriber that records every
//!   `tracing` event for assertions.
//! - [`RecordingLogger`] is a [`Logger`] that records the user-facing lines
//!   the client emits, in order, without printing anything.

use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use super::Logger;

/// A captured tracing event for assertion.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// The log level.
    pub level: Level,
    /// The target module.
    pub target: String,
    /// The formatted message.
    pub message: String,
    /// Field key-value pairs.
    pub fields: Vec<(String, String)>,
}

/// Thread-safe store for captured events.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Get all captured events.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Check if any event contains the given message substring.
    pub fn has_message(&self, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.message.contains(message_contains))
    }

    /// Check if any event at the given level contains the message substring.
    pub fn has_event(&self, level: Level, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(message_contains))
    }

    /// Count events at a specific level.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    /// Events filtered by target module prefix.
    pub fn events_for_target(&self, target_prefix: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.target.starts_with(target_prefix))
            .cloned()
            .collect()
    }

    /// Clear all captured logs.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// A tracing layer that captures events for testing.
struct CaptureLayer {
    logs: CapturedLogs,
}

/// Visitor that extracts the message and fields from an event.
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        if field.name() == "message" {
            self.message = val;
        } else {
            self.fields.push((field.name().to_owned(), val));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.message);
        } else {
            self.fields.push((field.name().to_owned(), value.to_owned()));
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);

        self.logs.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Install a test subscriber that captures all events and returns a handle
/// to the captured logs.
///
/// Uses `set_default` so it only applies to the current thread. Keep the
/// returned guard alive for the duration of the test.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let layer = CaptureLayer { logs: logs.clone() };

    let subscriber = tracing_subscriber::registry()
        .with(layer)
        .with(LevelFilter::TRACE);

    let guard = subscriber.set_default();
    (logs, guard)
}

// ─────────────────────────────────────────────────────────────────────────────
// RecordingLogger
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded error line: the message and the rendered cause, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorCall {
    /// The message passed to [`Logger::error`].
    pub message: String,
    /// `to_string()` of the cause.
    pub cause: Option<String>,
}

/// [`Logger`] that records calls instead of printing them.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    info: Arc<Mutex<Vec<String>>>,
    error: Arc<Mutex<Vec<ErrorCall>>>,
}

impl RecordingLogger {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Info lines in call order.
    pub fn info_calls(&self) -> Vec<String> {
        self.info.lock().clone()
    }

    /// Error lines in call order.
    pub fn error_calls(&self) -> Vec<ErrorCall> {
        self.error.lock().clone()
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.info.lock().clear();
        self.error.lock().clear();
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.info.lock().push(message.to_owned());
    }

    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        self.error.lock().push(ErrorCall {
            message: message.to_owned(),
            cause: cause.map(ToString::to_string),
        });
    }
}

impl std::fmt::Debug for RecordingLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingLogger")
            .field("info", &self.info.lock().len())
            .field("error", &self.error.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_info_event() {
        let (logs, _guard) = capture_logs();
        tracing::info!("hello world");
        assert!(logs.has_event(Level::INFO, "hello world"));
    }

    #[test]
    fn filter_by_level() {
        let (logs, _guard) = capture_logs();
        tracing::info!("info");
        tracing::warn!("warn");
        tracing::error!("error");

        assert_eq!(logs.count_at_level(Level::INFO), 1);
        assert_eq!(logs.count_at_level(Level::WARN), 1);
        assert_eq!(logs.count_at_level(Level::ERROR), 1);
    }

    #[test]
    fn filter_by_target() {
        let (logs, _guard) = capture_logs();
        tracing::info!(target: "hookline_client::session", "session event");
        tracing::info!(target: "hookline_settings::loader", "loader event");

        let session_events = logs.events_for_target("hookline_client");
        assert_eq!(session_events.len(), 1);
        assert!(session_events[0].message.contains("session event"));
    }

    #[test]
    fn clear_logs() {
        let (logs, _guard) = capture_logs();
        tracing::info!("event 1");
        assert_eq!(logs.events().len(), 1);

        logs.clear();
        assert!(logs.events().is_empty());
        assert!(!logs.has_message("event 1"));
    }

    #[test]
    fn recording_logger_keeps_order() {
        let logger = RecordingLogger::new();
        logger.info("first");
        logger.info("second");
        let cause = std::io::Error::other("boom");
        logger.error("failed", Some(&cause));
        logger.error("bare", None);

        assert_eq!(logger.info_calls(), vec!["first", "second"]);
        let errors = logger.error_calls();
        assert_eq!(errors[0].message, "failed");
        assert_eq!(errors[0].cause.as_deref(), Some("boom"));
        assert_eq!(errors[1].cause, None);

        logger.reset();
        assert!(logger.info_calls().is_empty());
        assert!(logger.error_calls().is_empty());
    }

    #[test]
    fn recording_logger_clones_share_state() {
        let logger = RecordingLogger::new();
        let clone = logger.clone();
        clone.info("from clone");
        assert_eq!(logger.info_calls(), vec!["from clone"]);
    }
}
