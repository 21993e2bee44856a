//! Channel allocation.
//!
//! The relay hands out channels through a redirect: `HEAD {relay}/new`
//! answers with a `Location` pointing at a fresh channel. The redirect is
//! never followed; the header value itself is the new source URL.

use hookline_core::{Endpoint, HooklineError, Result};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::{debug, instrument};

/// Channel endpoint of the public relay.
pub const DEFAULT_NEW_CHANNEL_URL: &str = "https://smee.io/new";

/// Options for [`create_channel`].
#[derive(Clone, Debug)]
pub struct ChannelOptions {
    /// Full URL of the `/new` endpoint.
    pub new_channel_url: String,
    /// Client to issue the request with. It must not follow redirects;
    /// when `None` a non-following client is built.
    pub http_client: Option<reqwest::Client>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            new_channel_url: DEFAULT_NEW_CHANNEL_URL.to_string(),
            http_client: None,
        }
    }
}

impl ChannelOptions {
    /// Options for a relay at `relay_url` (the `/new` suffix is appended).
    pub fn for_relay(relay_url: &str) -> Self {
        Self {
            new_channel_url: format!("{}/new", relay_url.trim_end_matches('/')),
            http_client: None,
        }
    }
}

/// Build a client that surfaces redirects instead of following them.
pub fn no_redirect_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().redirect(Policy::none()).build()?)
}

/// Allocate a new relay channel and return its URL verbatim.
#[instrument(skip_all, fields(url = %options.new_channel_url))]
pub async fn create_channel(options: ChannelOptions) -> Result<String> {
    let endpoint = Endpoint::parse(&options.new_channel_url)?;
    let http = match options.http_client {
        Some(client) => client,
        None => no_redirect_client()?,
    };

    let response = http.head(endpoint.url().clone()).send().await?;
    debug!(status = response.status().as_u16(), "channel allocation response");

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(HooklineError::ChannelCreation)?;

    Ok(location.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
