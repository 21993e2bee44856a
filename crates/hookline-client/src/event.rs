//! Relay events as seen by handlers.

use std::fmt;

use crate::sse::SseFrame;

/// Kind of a relay event, taken from the SSE `event` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayEventKind {
    /// Webhook delivery to forward.
    Message,
    /// Liveness heartbeat.
    Ping,
    /// Anything else the relay sends (`ready`, `close`, ...).
    Other(String),
}

impl RelayEventKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::Ping => "ping",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for RelayEventKind {
    fn from(name: &str) -> Self {
        match name {
            "message" => Self::Message,
            "ping" => Self::Ping,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RelayEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event received from the relay channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayEvent {
    /// Relay-assigned sequence id.
    pub id: Option<String>,
    /// Event kind.
    pub kind: RelayEventKind,
    /// Raw JSON-encoded payload.
    pub data: String,
}

impl RelayEvent {
    /// Whether this event carries a delivery to forward.
    pub fn is_message(&self) -> bool {
        self.kind == RelayEventKind::Message
    }
}

impl From<SseFrame> for RelayEvent {
    fn from(frame: SseFrame) -> Self {
        Self {
            id: frame.id,
            kind: RelayEventKind::from(frame.event.as_str()),
            data: frame.data,
        }
    }
}
