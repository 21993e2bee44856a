//! # hookline-client
//!
//! Relays webhook deliveries from a hosted relay channel to a local target.
//!
//! - [`channel`]: allocate a fresh relay channel (`HEAD {relay}/new`)
//! - [`sse`]: `text/event-stream` frame parser
//! - [`session`]: the long-lived subscription with reconnect policy and
//!   idle detection
//! - [`forwarder`]: translate a relay message into a `POST` on the target
//! - [`client`]: [`RelayClient`], the start/stop/forwarding lifecycle
//! - [`init_logging`]: stderr subscriber at the configured `logLevel`
//!
//! ```no_run
//! # async fn run() -> hookline_core::Result<()> {
//! use hookline_client::{ClientOptions, RelayClient};
//!
//! let client = RelayClient::new(ClientOptions::new(
//!     "https://smee.io/abc123",
//!     "http://127.0.0.1:3000/webhooks",
//! ))?;
//! client.start().await?;
//! # client.stop().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod channel;
pub mod client;
pub mod event;
pub mod forwarder;
pub mod session;
pub mod sse;

pub use channel::{ChannelOptions, DEFAULT_NEW_CHANNEL_URL, create_channel};
pub use client::{
    ClientOptions, ConnectionState, ErrorHandler, MessageHandler, OpenHandler, RelayClient,
};
pub use event::{RelayEvent, RelayEventKind};
pub use forwarder::{ForwardRequest, Forwarder};
pub use session::{ActivityClock, EventStreamSession, ReconnectPolicy, SessionEvent};

use hookline_settings::HooklineSettings;

/// Install the global stderr subscriber at `settings.log_level`.
///
/// `RUST_LOG` still wins when set. Later calls are no-ops.
pub fn init_logging(settings: &HooklineSettings) {
    hookline_core::logging::init_subscriber(&settings.log_level);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
