//! Multi-channel routing.
//!
//! A single configuration can fan several relay channels out to paths on
//! one local server: each `routes` entry maps a channel id to a target path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Channel routing block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSettings {
    /// Local port the target paths live on.
    pub port: u16,
    /// Channel id -> target path (e.g. `"abc123": "/github"`).
    pub routes: BTreeMap<String, String>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            port: 3000,
            routes: BTreeMap::new(),
        }
    }
}

/// One expanded source -> target pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRoute {
    /// Relay channel URL.
    pub source: String,
    /// Local delivery URL.
    pub target: String,
}

impl ChannelSettings {
    /// Expand routes against a relay base URL, ordered by channel id.
    pub fn routes(&self, relay_url: &str) -> Vec<ChannelRoute> {
        let relay = relay_url.trim_end_matches('/');
        self.routes
            .iter()
            .map(|(channel, path)| {
                let path = if path.starts_with('/') {
                    path.clone()
                } else {
                    format!("/{path}")
                };
                ChannelRoute {
                    source: format!("{relay}/{channel}"),
                    target: format!("http://127.0.0.1:{}{path}", self.port),
                }
            })
            .collect()
    }
}
