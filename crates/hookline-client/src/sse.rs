//! # SSE Frame Parser
//!
//! Turns the chunked body of a `text/event-stream` response into frames:
//! - Line buffering across chunk boundaries (`\n` or `\r\n`)
//! - `id`, `event` and `data` field accumulation
//! - Dispatch on blank line, multiple `data` lines joined with `\n`
//! - Comment lines (`:`) and `retry` fields are ignored
//!
//! A frame still being assembled when the body ends is discarded. Body
//! errors are yielded once as `Err` and end the stream.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tracing::trace;

/// Event type assumed when a frame carries no `event` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// One dispatched server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseFrame {
    /// Last `id` field seen in the frame.
    pub id: Option<String>,
    /// `event` field, or [`DEFAULT_EVENT_TYPE`].
    pub event: String,
    /// `data` lines joined with `\n`.
    pub data: String,
}

#[derive(Default)]
struct FrameBuilder {
    id: Option<String>,
    event: Option<String>,
    data: Option<String>,
}

impl FrameBuilder {
    /// Feed one line; returns a frame when the line terminates one.
    fn push_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "id" => self.id = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "data" => match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            other => trace!(field = other, "ignoring sse field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let builder = std::mem::take(self);
        if builder.event.is_none() && builder.data.is_none() {
            return None;
        }
        Some(SseFrame {
            id: builder.id,
            event: builder
                .event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            data: builder.data.unwrap_or_default(),
        })
    }
}

/// Parse SSE frames from a byte stream.
///
/// Generic over the body error type so the parser can be driven by a
/// `reqwest` body or by an in-memory stream.
pub fn parse_frames<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseFrame, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Send + 'static,
{
    futures::stream::unfold(
        (
            byte_stream,
            BytesMut::with_capacity(8192),
            FrameBuilder::default(),
            false,
        ),
        |(mut stream, mut buffer, mut builder, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let line = String::from_utf8_lossy(&line_bytes);
                    if let Some(frame) = builder.push_line(&line) {
                        return Some((Ok(frame), (stream, buffer, builder, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => return Some((Err(e), (stream, buffer, builder, true))),
                    None => return None,
                }
            }
        },
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &'static [&'static str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(parts: &'static [&'static str]) -> Vec<SseFrame> {
        parse_frames(chunks(parts))
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    // ── FrameBuilder ────────────────────────────────────────────────

    #[test]
    fn builder_dispatches_on_blank_line() {
        let mut b = FrameBuilder::default();
        assert!(b.push_line("id: 1").is_none());
        assert!(b.push_line("event: ping").is_none());
        assert!(b.push_line("data: {}").is_none());
        let frame = b.push_line("").unwrap();
        assert_eq!(frame.id.as_deref(), Some("1"));
        assert_eq!(frame.event, "ping");
        assert_eq!(frame.data, "{}");
    }

    #[test]
    fn builder_ignores_comments_and_retry() {
        let mut b = FrameBuilder::default();
        assert!(b.push_line(": keep-alive").is_none());
        assert!(b.push_line("retry: 3000").is_none());
        assert!(b.push_line("").is_none());
    }

    #[test]
    fn builder_field_without_space() {
        let mut b = FrameBuilder::default();
        let _ = b.push_line("data:{\"a\":1}");
        assert_eq!(b.push_line("").unwrap().data, "{\"a\":1}");
    }

    #[test]
    fn builder_resets_between_frames() {
        let mut b = FrameBuilder::default();
        let _ = b.push_line("event: ready");
        let _ = b.push_line("data: {}");
        let _ = b.push_line("");
        let _ = b.push_line("data: x");
        let frame = b.push_line("").unwrap();
        assert_eq!(frame.event, DEFAULT_EVENT_TYPE);
        assert_eq!(frame.id, None);
    }

    // ── parse_frames ────────────────────────────────────────────────

    #[tokio::test]
    async fn single_frame() {
        let frames = collect(&["id: 1\nevent: message\ndata: {\"body\":{}}\n\n"]).await;
        assert_eq!(
            frames,
            vec![SseFrame {
                id: Some("1".into()),
                event: "message".into(),
                data: "{\"body\":{}}".into(),
            }]
        );
    }

    #[tokio::test]
    async fn frame_split_across_chunks() {
        let frames = collect(&["id: 7\nev", "ent: ping\nda", "ta: {}\n", "\n"]).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "ping");
        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn crlf_line_endings() {
        let frames = collect(&["event: ready\r\ndata: {}\r\n\r\n"]).await;
        assert_eq!(frames[0].event, "ready");
        assert_eq!(frames[0].data, "{}");
    }

    #[tokio::test]
    async fn multi_line_data_joined() {
        let frames = collect(&["data: {\"a\":\ndata: 1}\n\n"]).await;
        assert_eq!(frames[0].data, "{\"a\":\n1}");
        assert_eq!(frames[0].event, "message");
    }

    #[tokio::test]
    async fn several_frames_in_one_chunk() {
        let frames =
            collect(&["event: ready\ndata: {}\n\n: comment\n\nid: 2\ndata: {}\n\nevent: ping\ndata: {}\n\n"])
                .await;
        let kinds: Vec<_> = frames.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(kinds, ["ready", "message", "ping"]);
    }

    #[tokio::test]
    async fn incomplete_frame_at_eof_dropped() {
        let frames = collect(&["data: {}\n\ndata: partial\n"]).await;
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn body_error_surfaces_once() {
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: {}\n\n")),
            Err(std::io::Error::other("other side closed")),
            Ok(Bytes::from_static(b"data: late\n\n")),
        ]);
        let items: Vec<_> = parse_frames(stream).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1].as_ref().unwrap_err().to_string(),
            "other side closed"
        );
    }
}
