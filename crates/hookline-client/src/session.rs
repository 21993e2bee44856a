//! # Event Stream Session
//!
//! Owns the subscription to a relay channel: a long-lived `GET` with
//! `Accept: text/event-stream`, parsed into [`RelayEvent`]s and reported to
//! the caller through a synchronous sink as [`SessionEvent`]s.
//!
//! ## Lifecycle
//!
//! ```text
//! connect ──2xx──▶ Open ──frames──▶ ... ──clean EOF / idle──▶ reconnect (policy)
//!    │                                 └──body error──▶ Error, session ends
//!    └──transport error / non-2xx──▶ Error, session ends
//! ```
//!
//! Reconnection after a clean end of stream is owned here through
//! [`ReconnectPolicy`]; the `retry` field of the stream is ignored. A fault
//! on an open stream is reported once and ends the session. Cancellation
//! is checked around every await, and once the token fires the sink is never
//! called again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use hookline_core::{Endpoint, HooklineError, Result};
use hookline_settings::ReconnectSetting;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::event::RelayEvent;
use crate::sse;

/// What the session does after the relay ends the stream cleanly or the
/// idle timer fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Reconnect right away.
    #[default]
    Immediate,
    /// Reconnect after a fixed delay.
    Delay(Duration),
    /// End the session.
    Never,
}

impl From<ReconnectSetting> for ReconnectPolicy {
    fn from(setting: ReconnectSetting) -> Self {
        match setting {
            ReconnectSetting::Immediate => Self::Immediate,
            ReconnectSetting::Delay { delay_ms } => Self::Delay(Duration::from_millis(delay_ms)),
            ReconnectSetting::Never => Self::Never,
        }
    }
}

/// Notifications delivered to the session sink.
#[derive(Debug)]
pub enum SessionEvent {
    /// The stream was established (again, after a reconnect).
    Open,
    /// A frame arrived.
    Event(RelayEvent),
    /// No frame arrived within the idle timeout; a reconnect follows
    /// according to the policy.
    Idle(Duration),
    /// The relay ended the stream and the policy does not reconnect.
    Closed,
    /// Transport fault. Always the last notification of a run.
    Error(HooklineError),
}

/// Shared "last seen" timestamp.
#[derive(Clone, Debug, Default)]
pub struct ActivityClock(Arc<Mutex<Option<DateTime<Utc>>>>);

impl ActivityClock {
    /// Record activity now.
    pub fn touch(&self) {
        *self.0.lock() = Some(Utc::now());
    }

    /// Time of the last recorded activity.
    pub fn last(&self) -> Option<DateTime<Utc>> {
        *self.0.lock()
    }
}

enum StreamEnd {
    Eof,
    Idle(Duration),
}

/// Subscription to one relay channel.
#[derive(Clone, Debug)]
pub struct EventStreamSession {
    http: reqwest::Client,
    source: Endpoint,
    policy: ReconnectPolicy,
    idle_timeout: Option<Duration>,
}

impl EventStreamSession {
    /// Session on `source` with the default policy and no idle timeout.
    pub fn new(http: reqwest::Client, source: Endpoint) -> Self {
        Self {
            http,
            source,
            policy: ReconnectPolicy::default(),
            idle_timeout: None,
        }
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restart the stream when it stays silent this long.
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Source endpoint.
    pub fn source(&self) -> &Endpoint {
        &self.source
    }

    async fn connect(&self) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(self.source.url().clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HooklineError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Drive the subscription until cancelled, closed or failed.
    ///
    /// `sink` runs on the calling task for every notification; it must not
    /// block.
    pub async fn run<F>(&self, cancel: CancellationToken, mut sink: F)
    where
        F: FnMut(SessionEvent),
    {
        loop {
            let connected = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                result = self.connect() => result,
            };

            let response = match connected {
                Ok(response) => response,
                Err(err) => {
                    warn!(source = %self.source, error = %err, "event stream connect failed");
                    sink(SessionEvent::Error(err));
                    return;
                }
            };

            debug!(source = %self.source, "event stream open");
            sink(SessionEvent::Open);

            let mut frames = Box::pin(sse::parse_frames(Box::pin(response.bytes_stream())));
            let end = loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    next = next_frame(&mut frames, self.idle_timeout) => next,
                };

                match next {
                    Ok(Some(Ok(frame))) => sink(SessionEvent::Event(RelayEvent::from(frame))),
                    Ok(Some(Err(err))) => {
                        sink(SessionEvent::Error(HooklineError::Disconnected {
                            reason: error_chain(&err),
                        }));
                        return;
                    }
                    Ok(None) => break StreamEnd::Eof,
                    Err(idle) => break StreamEnd::Idle(idle),
                }
            };

            match end {
                StreamEnd::Eof => debug!(source = %self.source, "event stream ended by relay"),
                StreamEnd::Idle(idle) => {
                    info!(source = %self.source, idle_ms = idle.as_millis(), "event stream idle");
                    sink(SessionEvent::Idle(idle));
                }
            }

            match self.policy {
                ReconnectPolicy::Immediate => {}
                ReconnectPolicy::Delay(delay) => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                ReconnectPolicy::Never => {
                    sink(SessionEvent::Closed);
                    return;
                }
            }
        }
    }
}

/// Next frame, or `Err(idle)` when none arrived within the idle timeout.
async fn next_frame<S, T>(frames: &mut S, idle: Option<Duration>) -> std::result::Result<Option<T>, Duration>
where
    S: futures::Stream<Item = T> + Unpin,
{
    match idle {
        Some(idle) => tokio::time::timeout(idle, frames.next())
            .await
            .map_err(|_| idle),
        None => Ok(frames.next().await),
    }
}

/// Render an error with its full source chain.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
