//! # Message Forwarder
//!
//! Translates a relay `message` payload into a `POST` against the target.
//!
//! The payload is a JSON object:
//!
//! ```json
//! { "body": {...}, "query": {"foo": "bar"}, "x-github-event": "push", "host": "smee.io" }
//! ```
//!
//! - `query` is merged into the target's query string (when enabled)
//! - `body` becomes the request body (strings verbatim, anything else as
//!   compact JSON), with `content-length` and `content-type` computed
//! - every other key becomes a header, except `host`
//!
//! Each request runs on its own task. Outcomes go to the [`Logger`]; there
//! is no retry.

use std::sync::Arc;

use hookline_core::{Endpoint, Logger, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::session::ActivityClock;

/// Payload keys that never become headers.
const RESERVED_KEYS: [&str; 5] = ["query", "body", "host", "content-length", "content-type"];

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.iter().any(|r| key.eq_ignore_ascii_case(r))
}

/// A fully built outbound request.
#[derive(Clone, Debug)]
pub struct ForwardRequest {
    /// Target URL with the merged query.
    pub url: Url,
    /// Headers, including `content-length` and `content-type`.
    pub headers: HeaderMap,
    /// Serialized body.
    pub body: String,
}

/// Builds and sends forward requests for one target.
pub struct Forwarder {
    target: Endpoint,
    http: reqwest::Client,
    logger: Arc<dyn Logger>,
    query_forwarding: bool,
    extra_headers: HeaderMap,
    activity: ActivityClock,
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("target", &self.target)
            .field("query_forwarding", &self.query_forwarding)
            .field("extra_headers", &self.extra_headers.len())
            .finish_non_exhaustive()
    }
}

impl Forwarder {
    /// Forwarder for `target` with query forwarding on and no extra headers.
    pub fn new(target: Endpoint, http: reqwest::Client, logger: Arc<dyn Logger>) -> Self {
        Self {
            target,
            http,
            logger,
            query_forwarding: true,
            extra_headers: HeaderMap::new(),
            activity: ActivityClock::default(),
        }
    }

    /// Enable or disable query merging.
    #[must_use]
    pub fn with_query_forwarding(mut self, enabled: bool) -> Self {
        self.query_forwarding = enabled;
        self
    }

    /// Static headers applied after payload headers. Reserved names and
    /// invalid entries are skipped.
    #[must_use]
    pub fn with_extra_headers<'a>(mut self, headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (name, value) in headers {
            if is_reserved(name) {
                warn!(header = name, "ignoring reserved extra header");
                continue;
            }
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    let _ = self.extra_headers.insert(name, value);
                }
                _ => warn!(header = name, "ignoring invalid extra header"),
            }
        }
        self
    }

    /// Clock updated whenever a forward completes.
    #[must_use]
    pub fn with_activity(mut self, activity: ActivityClock) -> Self {
        self.activity = activity;
        self
    }

    /// Target endpoint.
    pub fn target(&self) -> &Endpoint {
        &self.target
    }

    /// Build the outbound request for one event payload.
    pub fn build(&self, data: &str) -> Result<ForwardRequest> {
        let mut payload: Map<String, Value> = serde_json::from_str(data)?;

        let mut url = self.target.url().clone();
        if let Some(Value::Object(query)) = payload.remove("query") {
            if self.query_forwarding && !query.is_empty() {
                merge_query(&mut url, &query);
            }
        }

        let body = match payload.remove("body") {
            None => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };

        let mut headers = HeaderMap::new();
        for (key, value) in &payload {
            if is_reserved(key) {
                continue;
            }
            let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
                warn!(header = %key, "skipping invalid header name");
                continue;
            };
            for text in header_values(value) {
                match HeaderValue::from_str(&text) {
                    Ok(v) => {
                        let _ = headers.append(name.clone(), v);
                    }
                    Err(_) => warn!(header = %key, "skipping invalid header value"),
                }
            }
        }

        for (name, value) in &self.extra_headers {
            let _ = headers.insert(name.clone(), value.clone());
        }

        let _ = headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(ForwardRequest { url, headers, body })
    }

    /// Send a built request and log the outcome.
    pub async fn send(&self, request: ForwardRequest) {
        let url = request.url.to_string();
        debug!(url = %url, bytes = request.body.len(), "forwarding event");

        let result = self
            .http
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await;
        self.activity.touch();

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let line = format!("POST {url} - {status}");
                if status < 400 {
                    self.logger.info(&line);
                } else {
                    self.logger.error(&line, None);
                }
            }
            Err(err) => self.logger.error(&format!("POST {url} failed"), Some(&err)),
        }
    }

    /// Build and send on a new task. Does not wait for the response.
    pub fn dispatch(self: &Arc<Self>, data: &str) {
        match self.build(data) {
            Ok(request) => {
                let this = Arc::clone(self);
                drop(tokio::spawn(async move { this.send(request).await }));
            }
            Err(err) => self.logger.error("Failed to parse event payload", Some(&err)),
        }
    }
}

/// Merge `query` into `url`: same-named keys are replaced in place, other
/// keys of the target are kept, new keys are appended.
fn merge_query(url: &mut Url, query: &Map<String, Value>) {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    for (key, value) in query {
        let at = pairs.iter().position(|(k, _)| k == key).unwrap_or(pairs.len());
        pairs.retain(|(k, _)| k != key);
        let at = at.min(pairs.len());
        for (offset, text) in query_values(value).into_iter().enumerate() {
            pairs.insert(at + offset, (key.clone(), text));
        }
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url.query_pairs_mut();
        let _ = serializer.clear().extend_pairs(pairs);
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn query_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        other => vec![scalar_text(other)],
    }
}

fn header_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        Value::Object(_) => vec![value.to_string()],
        other => vec![scalar_text(other)],
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
