//! Validated HTTP(S) endpoints.
//!
//! An [`Endpoint`] is the parsed form of a source (subscribe address) or
//! target (delivery address). Validation happens once at construction:
//! the string must be an absolute URL with an `http`/`https` scheme and a
//! non-empty host. Trailing slashes are trimmed from the path so that
//! channel paths can be appended without doubling up; query and fragment
//! are left untouched.

use std::fmt;

use url::Url;

use crate::errors::{HooklineError, Result};

/// A validated, immutable HTTP(S) endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    display: String,
}

impl Endpoint {
    /// Parse and validate an endpoint.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let mut url = Url::parse(trimmed).map_err(|e| HooklineError::invalid_url(input, e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(HooklineError::invalid_url(
                    input,
                    format!("unsupported scheme `{other}`"),
                ));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(HooklineError::invalid_url(input, "missing host"));
        }

        let path = url.path().trim_end_matches('/').to_string();
        if !path.is_empty() && path.len() < url.path().len() {
            url.set_path(&path);
        }
        let display = display_form(&url);
        Ok(Self { url, display })
    }

    /// The parsed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The endpoint as requested, without a trailing path slash.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// URL scheme (`http` or `https`).
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Port, explicit or the scheme default.
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    /// Path component (always starts with `/`).
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// Append a path segment, e.g. `/new` or a channel id.
    pub fn join_path(&self, segment: &str) -> String {
        format!("{}/{}", self.display, segment.trim_start_matches('/'))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl std::str::FromStr for Endpoint {
    type Err = HooklineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A bare root path prints without its slash (`https://example.com`).
fn display_form(url: &Url) -> String {
    let text = url.as_str();
    if url.path() == "/" && url.query().is_none() && url.fragment().is_none() {
        text.strip_suffix('/').unwrap_or(text).to_string()
    } else {
        text.to_string()
    }
}

/// Whether `input` would be accepted by [`Endpoint::parse`].
pub fn is_valid_url(input: &str) -> bool {
    Endpoint::parse(input).is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
