//! # Relay Client
//!
//! [`RelayClient`] binds the channel allocator, the event stream session and
//! the forwarder into one object with a small lifecycle:
//!
//! ```text
//! Idle ──start()──▶ Connecting ──open──▶ Open ──stop() / fault──▶ Closed
//!                       │                                           ▲
//!                       └──error / max_connection_timeout───────────┘
//! ```
//!
//! ## Handlers
//!
//! `onopen`, `onmessage` and `onerror` are single slots. Assigning replaces,
//! `None` clears, and `stop()` resets all three. Slots can be set at any
//! time; the running session reads them per event. Custom handlers run
//! before the built-in behavior (log line, forwarding).
//!
//! ## Races
//!
//! Every run owns a gate that is locked while an event is dispatched. The
//! connection timeout and `stop()` close the gate before cancelling the
//! task, so once either returns no handler runs for that session again.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hookline_core::{Endpoint, HooklineError, Logger, Result, default_logger};
use hookline_settings::HooklineSettings;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::channel::{self, ChannelOptions, DEFAULT_NEW_CHANNEL_URL};
use crate::event::{RelayEvent, RelayEventKind};
use crate::forwarder::Forwarder;
use crate::session::{ActivityClock, EventStreamSession, ReconnectPolicy, SessionEvent};

/// Handler for the `open` slot.
pub type OpenHandler = Arc<dyn Fn() + Send + Sync>;
/// Handler for the `message` slot.
pub type MessageHandler = Arc<dyn Fn(&RelayEvent) + Send + Sync>;
/// Handler for the `error` slot.
pub type ErrorHandler = Arc<dyn Fn(&HooklineError) + Send + Sync>;

/// Connection state of a [`RelayClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never started.
    Idle,
    /// `start()` is waiting for the stream to open.
    Connecting,
    /// The stream is open.
    Open,
    /// Stopped, timed out or failed.
    Closed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Construction options for [`RelayClient`].
#[derive(Clone)]
pub struct ClientOptions {
    /// Channel URL to subscribe to. Required by [`RelayClient::new`];
    /// [`RelayClient::with_new_channel`] allocates one when absent.
    pub source: Option<String>,
    /// Delivery URL.
    pub target: Option<String>,
    /// Sink for user-facing log lines.
    pub logger: Arc<dyn Logger>,
    /// Merge event queries into the target query string.
    pub query_forwarding: bool,
    /// `None` enables forwarding on open, `Some(true)` enables it right
    /// away, `Some(false)` keeps it off until `start_forwarding()`.
    pub forward: Option<bool>,
    /// Fail `start()` when the stream has not opened in time.
    pub max_connection_timeout: Option<Duration>,
    /// Restart an open stream that stayed silent this long.
    pub idle_reconnect: Option<Duration>,
    /// Behavior after the relay ends the stream.
    pub reconnect: ReconnectPolicy,
    /// Static headers for every forwarded request.
    pub headers: BTreeMap<String, String>,
    /// `/new` endpoint used by [`RelayClient::with_new_channel`].
    pub new_channel_url: String,
    /// Transport for the stream and forwarded requests.
    pub http_client: Option<reqwest::Client>,
    /// Transport for channel allocation. Must not follow redirects; when
    /// `None` a non-following client is built.
    pub channel_http_client: Option<reqwest::Client>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            logger: default_logger(),
            query_forwarding: true,
            forward: None,
            max_connection_timeout: None,
            idle_reconnect: None,
            reconnect: ReconnectPolicy::default(),
            headers: BTreeMap::new(),
            new_channel_url: DEFAULT_NEW_CHANNEL_URL.to_string(),
            http_client: None,
            channel_http_client: None,
        }
    }
}

impl ClientOptions {
    /// Options for a source/target pair.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Map loaded settings onto client options.
    pub fn from_settings(settings: &HooklineSettings) -> Self {
        Self {
            source: settings.source.clone(),
            target: settings.target.clone(),
            logger: default_logger(),
            query_forwarding: settings.query_forwarding,
            forward: settings.forward,
            max_connection_timeout: settings.max_connection_timeout_ms.map(Duration::from_millis),
            idle_reconnect: settings.idle_reconnect_ms.map(Duration::from_millis),
            reconnect: settings.reconnect.into(),
            headers: settings.headers.clone(),
            new_channel_url: settings.new_channel_url(),
            http_client: None,
            channel_http_client: None,
        }
    }

    /// One set of options per configured channel route.
    pub fn for_routes(settings: &HooklineSettings) -> Vec<Self> {
        let base = Self::from_settings(settings);
        settings
            .routes()
            .into_iter()
            .map(|route| Self {
                source: Some(route.source),
                target: Some(route.target),
                ..base.clone()
            })
            .collect()
    }

    /// Set the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Enable or disable query forwarding.
    #[must_use]
    pub fn with_query_forwarding(mut self, enabled: bool) -> Self {
        self.query_forwarding = enabled;
        self
    }

    /// Set the initial forwarding state.
    #[must_use]
    pub fn with_forward(mut self, forward: bool) -> Self {
        self.forward = Some(forward);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_max_connection_timeout(mut self, timeout: Duration) -> Self {
        self.max_connection_timeout = Some(timeout);
        self
    }

    /// Set the idle reconnect interval.
    #[must_use]
    pub fn with_idle_reconnect(mut self, idle: Duration) -> Self {
        self.idle_reconnect = Some(idle);
        self
    }

    /// Set the reconnect policy.
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Add a static header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.headers.insert(name.into(), value.into());
        self
    }

    /// Inject the HTTP transport.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Inject the transport used for channel allocation.
    #[must_use]
    pub fn with_channel_http_client(mut self, client: reqwest::Client) -> Self {
        self.channel_http_client = Some(client);
        self
    }

    /// Set the `/new` endpoint for channel allocation.
    #[must_use]
    pub fn with_new_channel_url(mut self, url: impl Into<String>) -> Self {
        self.new_channel_url = url.into();
        self
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("query_forwarding", &self.query_forwarding)
            .field("forward", &self.forward)
            .field("max_connection_timeout", &self.max_connection_timeout)
            .field("idle_reconnect", &self.idle_reconnect)
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct HandlerSlots {
    open: RwLock<Option<OpenHandler>>,
    message: RwLock<Option<MessageHandler>>,
    error: RwLock<Option<ErrorHandler>>,
}

impl HandlerSlots {
    fn clear(&self) {
        *self.open.write() = None;
        *self.message.write() = None;
        *self.error.write() = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunPhase {
    Connecting,
    Open,
    Done,
}

type RunGate = Arc<Mutex<RunPhase>>;

/// Close the gate; returns the phase it was in.
fn close_gate(gate: &RunGate) -> RunPhase {
    std::mem::replace(&mut *gate.lock(), RunPhase::Done)
}

/// Close the gate only if the stream has not opened yet.
fn abandon_if_connecting(gate: &RunGate) -> bool {
    let mut phase = gate.lock();
    if *phase == RunPhase::Connecting {
        *phase = RunPhase::Done;
        true
    } else {
        false
    }
}

struct Shared {
    source: Endpoint,
    target: Endpoint,
    logger: Arc<dyn Logger>,
    http: reqwest::Client,
    forward: Option<bool>,
    max_connection_timeout: Option<Duration>,
    idle_reconnect: Option<Duration>,
    reconnect: ReconnectPolicy,
    forwarder: Arc<Forwarder>,
    forwarding: AtomicBool,
    handlers: HandlerSlots,
    state: Mutex<ConnectionState>,
    activity: ActivityClock,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    fn enable_forwarding(&self) {
        if self.forwarding.swap(true, Ordering::SeqCst) {
            self.logger.info("Forwarding is already enabled");
        } else {
            self.logger
                .info(&format!("Forwarding {} to {}", self.source, self.target));
        }
    }

    fn disable_forwarding(&self) {
        if self.forwarding.swap(false, Ordering::SeqCst) {
            self.logger
                .info(&format!("Stopped forwarding {} to {}", self.source, self.target));
        } else {
            self.logger.info("Forwarding is already disabled");
        }
    }

    fn on_open(&self, first: bool) {
        self.set_state(ConnectionState::Open);
        self.activity.touch();

        let handler = self.handlers.open.read().clone();
        if let Some(handler) = handler {
            handler();
        }
        self.logger.info(&format!("Connected to {}", self.source));

        if first && self.forward != Some(false) {
            self.forwarding.store(true, Ordering::SeqCst);
            self.logger
                .info(&format!("Forwarding {} to {}", self.source, self.target));
        }
    }

    fn on_event(&self, event: &RelayEvent) {
        self.activity.touch();
        match &event.kind {
            RelayEventKind::Message => {
                let handler = self.handlers.message.read().clone();
                if let Some(handler) = handler {
                    handler(event);
                }
                if self.forwarding.load(Ordering::SeqCst) {
                    self.forwarder.dispatch(&event.data);
                } else {
                    trace!(id = ?event.id, "forwarding disabled, dropping message");
                }
            }
            RelayEventKind::Ping => trace!(source = %self.source, "ping"),
            RelayEventKind::Other(kind) => debug!(source = %self.source, kind = %kind, "relay event"),
        }
    }

    fn on_error(&self, err: &HooklineError) {
        let handler = self.handlers.error.read().clone();
        if let Some(handler) = handler {
            handler(err);
        }
        self.logger.error("Error in connection", Some(err));
    }

    /// Run one session, dispatching its notifications under the gate.
    async fn drive(
        self: Arc<Self>,
        session: EventStreamSession,
        cancel: CancellationToken,
        gate: RunGate,
        open_tx: oneshot::Sender<Result<()>>,
    ) {
        let mut open_tx = Some(open_tx);
        session
            .run(cancel, |event| {
                let mut phase = gate.lock();
                if *phase == RunPhase::Done {
                    return;
                }
                match event {
                    SessionEvent::Open => {
                        let first = *phase == RunPhase::Connecting;
                        *phase = RunPhase::Open;
                        self.on_open(first);
                        if let Some(tx) = open_tx.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    SessionEvent::Event(event) => self.on_event(&event),
                    SessionEvent::Idle(idle) => self.logger.info(&format!(
                        "No events for {}ms, restarting connection to {}",
                        idle.as_millis(),
                        self.source
                    )),
                    SessionEvent::Closed => {
                        *phase = RunPhase::Done;
                        self.set_state(ConnectionState::Closed);
                        self.forwarding.store(false, Ordering::SeqCst);
                        self.logger.info("Connection closed");
                    }
                    SessionEvent::Error(err) => {
                        *phase = RunPhase::Done;
                        self.set_state(ConnectionState::Closed);
                        match open_tx.take() {
                            Some(tx) => {
                                let _ = tx.send(Err(err));
                            }
                            None => self.on_error(&err),
                        }
                    }
                }
            })
            .await;
    }
}

struct ActiveSession {
    cancel: CancellationToken,
    gate: RunGate,
    task: JoinHandle<()>,
}

impl ActiveSession {
    /// Close the gate, cancel and join. Returns whether the session was
    /// still live.
    async fn shutdown(self) -> bool {
        let was_live = close_gate(&self.gate) != RunPhase::Done;
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            if err.is_panic() {
                warn!(error = %err, "session task panicked");
            }
        }
        was_live
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Forwards events from a relay channel to a target endpoint.
pub struct RelayClient {
    shared: Arc<Shared>,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("source", &self.shared.source)
            .field("target", &self.shared.target)
            .field("state", &self.state())
            .field("forwarding", &self.is_forwarding())
            .finish_non_exhaustive()
    }
}

impl RelayClient {
    /// Validate options and build a client. No network activity happens
    /// until [`start`](Self::start).
    pub fn new(options: ClientOptions) -> Result<Self> {
        let source = match options.source.as_deref() {
            Some(source) => Endpoint::parse(source)?,
            None => return Err(HooklineError::invalid_url("", "missing source")),
        };
        let target = match options.target.as_deref() {
            Some(target) => Endpoint::parse(target)?,
            None => return Err(HooklineError::invalid_url("", "missing target")),
        };

        let http = match options.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };

        let activity = ActivityClock::default();
        let forwarder = Forwarder::new(target.clone(), http.clone(), Arc::clone(&options.logger))
            .with_query_forwarding(options.query_forwarding)
            .with_extra_headers(options.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .with_activity(activity.clone());

        Ok(Self {
            shared: Arc::new(Shared {
                source,
                target,
                logger: options.logger,
                http,
                forward: options.forward,
                max_connection_timeout: options.max_connection_timeout,
                idle_reconnect: options.idle_reconnect,
                reconnect: options.reconnect,
                forwarder: Arc::new(forwarder),
                forwarding: AtomicBool::new(options.forward == Some(true)),
                handlers: HandlerSlots::default(),
                state: Mutex::new(ConnectionState::Idle),
                activity,
            }),
            session: tokio::sync::Mutex::new(None),
        })
    }

    /// Build a client, allocating a channel first when no source is set.
    pub async fn with_new_channel(mut options: ClientOptions) -> Result<Self> {
        if options.source.is_none() {
            let channel = channel::create_channel(ChannelOptions {
                new_channel_url: options.new_channel_url.clone(),
                http_client: options.channel_http_client.clone(),
            })
            .await?;
            info!(channel = %channel, "allocated relay channel");
            options.source = Some(channel);
        }
        Self::new(options)
    }

    /// Allocate a new relay channel. See [`channel::create_channel`].
    pub async fn create_channel(options: ChannelOptions) -> Result<String> {
        channel::create_channel(options).await
    }

    /// Open the event stream.
    ///
    /// Resolves once the stream is open. Fails with the transport error if
    /// the stream cannot be opened, with
    /// [`HooklineError::ConnectionTimeout`] when `max_connection_timeout`
    /// elapses first, and with [`HooklineError::AlreadyStarted`] while a
    /// session is live.
    pub async fn start(&self) -> Result<()> {
        let (gate, mut open_rx) = {
            let mut slot = self.session.lock().await;
            if slot.as_ref().is_some_and(|active| !active.task.is_finished()) {
                return Err(HooklineError::AlreadyStarted);
            }
            if let Some(stale) = slot.take() {
                let _ = stale.shutdown().await;
            }

            self.shared.set_state(ConnectionState::Connecting);
            let session = EventStreamSession::new(self.shared.http.clone(), self.shared.source.clone())
                .with_policy(self.shared.reconnect)
                .with_idle_timeout(self.shared.idle_reconnect);

            let cancel = CancellationToken::new();
            let gate: RunGate = Arc::new(Mutex::new(RunPhase::Connecting));
            let (open_tx, open_rx) = oneshot::channel();
            let task = tokio::spawn(Arc::clone(&self.shared).drive(
                session,
                cancel.clone(),
                Arc::clone(&gate),
                open_tx,
            ));

            *slot = Some(ActiveSession {
                cancel,
                gate: Arc::clone(&gate),
                task,
            });
            (gate, open_rx)
        };

        let outcome = match self.shared.max_connection_timeout {
            None => open_rx.await,
            Some(limit) => match tokio::time::timeout(limit, &mut open_rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    if abandon_if_connecting(&gate) {
                        return Err(self.abort_pending(limit).await);
                    }
                    // open won the race (or stop() got there first)
                    open_rx.await
                }
            },
        };

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.shared.on_error(&err);
                Err(err)
            }
            Err(_) => Err(HooklineError::Disconnected {
                reason: "client stopped before the connection opened".into(),
            }),
        }
    }

    async fn abort_pending(&self, limit: Duration) -> HooklineError {
        let err = HooklineError::ConnectionTimeout {
            endpoint: self.shared.source.to_string(),
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        };

        let active = self.session.lock().await.take();
        if let Some(active) = active {
            let _ = active.shutdown().await;
        }

        self.shared.set_state(ConnectionState::Closed);
        self.shared.logger.error(&err.to_string(), None);
        self.shared.logger.info("Connection closed");
        err
    }

    /// Close the stream. Idempotent.
    ///
    /// When this returns, no handler runs again for the closed session.
    /// Handler slots are reset and forwarding is disabled.
    pub async fn stop(&self) {
        let active = self.session.lock().await.take();
        let was_live = match active {
            Some(active) => active.shutdown().await,
            None => false,
        };

        self.shared.handlers.clear();
        self.shared.forwarding.store(false, Ordering::SeqCst);

        if was_live {
            self.shared.set_state(ConnectionState::Closed);
            self.shared.logger.info("Connection closed");
        }
    }

    /// Resume forwarding messages to the target.
    pub fn start_forwarding(&self) {
        self.shared.enable_forwarding();
    }

    /// Drop incoming messages instead of forwarding them. The stream stays
    /// open.
    pub fn stop_forwarding(&self) {
        self.shared.disable_forwarding();
    }

    /// Whether messages are currently forwarded.
    pub fn is_forwarding(&self) -> bool {
        self.shared.forwarding.load(Ordering::SeqCst)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Source endpoint.
    pub fn source(&self) -> &Endpoint {
        &self.shared.source
    }

    /// Target endpoint.
    pub fn target(&self) -> &Endpoint {
        &self.shared.target
    }

    /// Time of the last open, frame or completed forward.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.shared.activity.last()
    }

    /// Current `open` handler.
    pub fn onopen(&self) -> Option<OpenHandler> {
        self.shared.handlers.open.read().clone()
    }

    /// Replace the `open` handler; `None` clears it.
    pub fn set_onopen(&self, handler: Option<OpenHandler>) {
        *self.shared.handlers.open.write() = handler;
    }

    /// Current `message` handler.
    pub fn onmessage(&self) -> Option<MessageHandler> {
        self.shared.handlers.message.read().clone()
    }

    /// Replace the `message` handler; `None` clears it.
    pub fn set_onmessage(&self, handler: Option<MessageHandler>) {
        *self.shared.handlers.message.write() = handler;
    }

    /// Current `error` handler.
    pub fn onerror(&self) -> Option<ErrorHandler> {
        self.shared.handlers.error.read().clone()
    }

    /// Replace the `error` handler; `None` clears it.
    pub fn set_onerror(&self, handler: Option<ErrorHandler>) {
        *self.shared.handlers.error.write() = handler;
    }

    /// Set the `open` handler from a closure.
    pub fn on_open(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.set_onopen(Some(Arc::new(handler)));
    }

    /// Set the `message` handler from a closure.
    pub fn on_message(&self, handler: impl Fn(&RelayEvent) + Send + Sync + 'static) {
        self.set_onmessage(Some(Arc::new(handler)));
    }

    /// Set the `error` handler from a closure.
    pub fn on_error(&self, handler: impl Fn(&HooklineError) + Send + Sync + 'static) {
        self.set_onerror(Some(Arc::new(handler)));
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        if let Some(active) = self.session.get_mut().take() {
            let _ = close_gate(&active.gate);
            active.cancel.cancel();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use hookline_core::logging::RecordingLogger;
    use hookline_settings::ReconnectSetting;

    fn client_with(logger: &Arc<RecordingLogger>, options: ClientOptions) -> RelayClient {
        RelayClient::new(options.with_logger(logger.clone())).unwrap()
    }

    #[test]
    fn invalid_source_rejected_synchronously() {
        let err = RelayClient::new(ClientOptions::new("mailto:a@b.c", "http://localhost:3000")).unwrap_err();
        assert_matches!(err, HooklineError::InvalidUrl { .. });
    }

    #[test]
    fn invalid_target_rejected_synchronously() {
        let err = RelayClient::new(ClientOptions::new("https://smee.io/abc", "ftp://files")).unwrap_err();
        assert_matches!(err, HooklineError::InvalidUrl { .. });
    }

    #[test]
    fn missing_source_rejected() {
        let options = ClientOptions {
            target: Some("http://localhost:3000".into()),
            ..ClientOptions::default()
        };
        assert_matches!(RelayClient::new(options), Err(HooklineError::InvalidUrl { .. }));
    }

    #[test]
    fn initial_state() {
        let logger = Arc::new(RecordingLogger::new());
        let client = client_with(&logger, ClientOptions::new("https://smee.io/abc/", "http://localhost:3000"));
        assert_eq!(client.state(), ConnectionState::Idle);
        assert!(!client.is_forwarding());
        assert_eq!(client.source().as_str(), "https://smee.io/abc");
        assert!(client.onopen().is_none());
        assert!(client.onmessage().is_none());
        assert!(client.onerror().is_none());
        assert!(client.last_activity().is_none());
        assert!(logger.info_calls().is_empty());
    }

    #[test]
    fn forward_true_enables_at_construction() {
        let logger = Arc::new(RecordingLogger::new());
        let client = client_with(
            &logger,
            ClientOptions::new("https://smee.io/abc", "http://localhost:3000").with_forward(true),
        );
        assert!(client.is_forwarding());
    }

    #[test]
    fn forwarding_toggles_log_once_per_transition() {
        let logger = Arc::new(RecordingLogger::new());
        let client = client_with(&logger, ClientOptions::new("https://smee.io/abc", "http://localhost:3000"));

        client.start_forwarding();
        client.start_forwarding();
        client.stop_forwarding();
        client.stop_forwarding();

        assert_eq!(
            logger.info_calls(),
            vec![
                "Forwarding https://smee.io/abc to http://localhost:3000".to_string(),
                "Forwarding is already enabled".to_string(),
                "Stopped forwarding https://smee.io/abc to http://localhost:3000".to_string(),
                "Forwarding is already disabled".to_string(),
            ]
        );
        assert!(logger.error_calls().is_empty());
    }

    #[test]
    fn handler_slots_replace_and_clear() {
        let logger = Arc::new(RecordingLogger::new());
        let client = client_with(&logger, ClientOptions::new("https://smee.io/abc", "http://localhost:3000"));

        let first: OpenHandler = Arc::new(|| {});
        let second: OpenHandler = Arc::new(|| {});
        client.set_onopen(Some(Arc::clone(&first)));
        client.set_onopen(Some(Arc::clone(&second)));
        assert!(Arc::ptr_eq(&client.onopen().unwrap(), &second));

        client.set_onopen(None);
        assert!(client.onopen().is_none());

        client.on_message(|_| {});
        client.on_error(|_| {});
        assert!(client.onmessage().is_some());
        assert!(client.onerror().is_some());
    }

    #[tokio::test]
    async fn stop_before_start_is_a_noop_that_resets_handlers() {
        let logger = Arc::new(RecordingLogger::new());
        let client = client_with(&logger, ClientOptions::new("https://smee.io/abc", "http://localhost:3000"));
        client.on_open(|| {});
        client.stop().await;
        client.stop().await;
        assert!(client.onopen().is_none());
        assert!(logger.info_calls().is_empty());
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[test]
    fn options_from_settings() {
        let mut settings = HooklineSettings {
            source: Some("https://smee.io/abc".into()),
            target: Some("http://127.0.0.1:3000/hook".into()),
            query_forwarding: false,
            forward: Some(false),
            max_connection_timeout_ms: Some(500),
            idle_reconnect_ms: Some(60_000),
            reconnect: ReconnectSetting::Never,
            ..HooklineSettings::default()
        };
        let _ = settings.headers.insert("x-relay".into(), "hookline".into());

        let options = ClientOptions::from_settings(&settings);
        assert_eq!(options.source.as_deref(), Some("https://smee.io/abc"));
        assert!(!options.query_forwarding);
        assert_eq!(options.forward, Some(false));
        assert_eq!(options.max_connection_timeout, Some(Duration::from_millis(500)));
        assert_eq!(options.idle_reconnect, Some(Duration::from_secs(60)));
        assert_eq!(options.reconnect, ReconnectPolicy::Never);
        assert_eq!(options.headers["x-relay"], "hookline");
        assert_eq!(options.new_channel_url, "https://smee.io/new");
    }

    #[test]
    fn options_for_routes() {
        let mut settings = HooklineSettings::default();
        let _ = settings.channels.routes.insert("abc".into(), "/github".into());
        let _ = settings.channels.routes.insert("def".into(), "/stripe".into());

        let all = ClientOptions::for_routes(&settings);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].source.as_deref(), Some("https://smee.io/abc"));
        assert_eq!(all[0].target.as_deref(), Some("http://127.0.0.1:3000/github"));
        assert_eq!(all[1].source.as_deref(), Some("https://smee.io/def"));
        assert!(all.iter().all(|o| RelayClient::new(o.clone()).is_ok()));
    }
}
