//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format. Types marked with `#[serde(default)]` allow partial JSON; missing
//! fields get their default value during deserialization.

mod channels;

pub use channels::{ChannelRoute, ChannelSettings};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Relay used when no source is configured and a channel has to be allocated.
pub const DEFAULT_RELAY_URL: &str = "https://smee.io";

/// Root settings type.
///
/// Loaded from `~/.hookline/settings.json` with defaults applied for
/// missing fields. Environment variables can override specific values.
///
/// ```json
/// {
///   "source": "https://smee.io/abc123",
///   "target": "http://127.0.0.1:3000/webhooks",
///   "maxConnectionTimeoutMs": 5000
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HooklineSettings {
    /// Channel URL to subscribe to. `None` allocates a fresh channel.
    pub source: Option<String>,
    /// Delivery URL for forwarded requests.
    pub target: Option<String>,
    /// Relay base URL used for channel allocation and channel routes.
    pub relay_url: String,
    /// Merge the event's query map into the target's query string.
    pub query_forwarding: bool,
    /// Forwarding at construction: unset = enable on open, `true` = enabled,
    /// `false` = stays off until explicitly enabled.
    pub forward: Option<bool>,
    /// Abort `start()` if the stream has not opened within this many ms.
    pub max_connection_timeout_ms: Option<u64>,
    /// Restart an open stream that stayed silent for this many ms.
    pub idle_reconnect_ms: Option<u64>,
    /// What to do when the relay ends the stream.
    pub reconnect: ReconnectSetting,
    /// Static headers added to every forwarded request.
    pub headers: BTreeMap<String, String>,
    /// Minimum level for the stderr subscriber.
    pub log_level: String,
    /// Multi-channel routing block.
    pub channels: ChannelSettings,
}

impl Default for HooklineSettings {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            relay_url: DEFAULT_RELAY_URL.to_string(),
            query_forwarding: true,
            forward: None,
            max_connection_timeout_ms: None,
            idle_reconnect_ms: None,
            reconnect: ReconnectSetting::default(),
            headers: BTreeMap::new(),
            log_level: "info".to_string(),
            channels: ChannelSettings::default(),
        }
    }
}

impl HooklineSettings {
    /// Expand the channel block into `(source, target)` pairs.
    pub fn routes(&self) -> Vec<ChannelRoute> {
        self.channels.routes(&self.relay_url)
    }

    /// The `/new` endpoint of the configured relay.
    pub fn new_channel_url(&self) -> String {
        format!("{}/new", self.relay_url.trim_end_matches('/'))
    }
}

/// Reconnect behavior after the relay closes the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconnectSetting {
    /// Reconnect with no delay.
    #[default]
    Immediate,
    /// Reconnect after a fixed delay.
    Delay {
        /// Delay in milliseconds.
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
    /// Leave the session closed.
    Never,
}
