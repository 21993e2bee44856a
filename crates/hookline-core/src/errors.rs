//! Error hierarchy for the hookline relay client.
//!
//! A single [`HooklineError`] enum covers every failure the client can
//! surface:
//!
//! - configuration failures raised synchronously at construction
//!   ([`HooklineError::InvalidUrl`])
//! - channel allocation failures ([`HooklineError::ChannelCreation`])
//! - connection failures of the event stream ([`HooklineError::ConnectionTimeout`],
//!   [`HooklineError::Transport`], [`HooklineError::Status`],
//!   [`HooklineError::Disconnected`])
//! - lifecycle misuse ([`HooklineError::AlreadyStarted`])
//! - undecodable relay payloads ([`HooklineError::InvalidPayload`])

use thiserror::Error;

/// Result type alias for hookline operations.
pub type Result<T> = std::result::Result<T, HooklineError>;

/// Errors produced by the relay client.
#[derive(Debug, Error)]
pub enum HooklineError {
    /// A source or target URL failed validation.
    #[error("The provided URL is invalid: {url} ({reason})")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The relay did not hand out a channel.
    #[error("Failed to create channel")]
    ChannelCreation,

    /// The event stream did not open within the configured timeout.
    #[error("Connection to {endpoint} timed out after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Source endpoint the client tried to reach.
        endpoint: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// HTTP transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered the subscribe request with a non-success status.
    #[error("Unexpected status {status} from event stream")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// An open event stream broke off.
    #[error("Connection lost: {reason}")]
    Disconnected {
        /// Underlying cause as reported by the transport.
        reason: String,
    },

    /// `start()` was called while a session is live.
    #[error("Client is already started")]
    AlreadyStarted,

    /// A relay event carried data that is not a JSON object.
    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl HooklineError {
    /// Build an [`HooklineError::InvalidUrl`].
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error belongs to the transport family (reported through
    /// the error handler rather than failing a call).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status { .. } | Self::Disconnected { .. }
        )
    }

    /// Short category string used as a structured log field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "config",
            Self::ChannelCreation => "channel",
            Self::ConnectionTimeout { .. } => "timeout",
            Self::Transport(_) | Self::Status { .. } | Self::Disconnected { .. } => "transport",
            Self::AlreadyStarted => "lifecycle",
            Self::InvalidPayload(_) => "parse",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
