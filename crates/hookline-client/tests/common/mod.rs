//! Shared fixtures: an in-process relay, a silent server and a target.

#![allow(dead_code, missing_docs)]

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, head};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TIMEOUT: Duration = Duration::from_secs(5);

type Frames = mpsc::UnboundedSender<Result<Bytes, io::Error>>;

struct RelayState {
    host: String,
    channel_id: String,
    stream: Mutex<Option<Frames>>,
    counter: AtomicU64,
    connections: AtomicUsize,
}

impl RelayState {
    fn write(&self, event: &str, data: &Value) {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = format!("id: {id}\nevent: {event}\ndata: {data}\n\n");
        let guard = self.stream.lock();
        let tx = guard.as_ref().expect("no SSE connection established");
        tx.send(Ok(Bytes::from(frame))).expect("stream receiver dropped");
    }
}

/// In-process relay: `HEAD /new` redirects to the channel, `GET /{channel}`
/// streams events.
pub struct RelayServer {
    addr: SocketAddr,
    state: Arc<RelayState>,
    _server: JoinHandle<()>,
}

impl RelayServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(RelayState {
            host: format!("http://{addr}"),
            channel_id: format!("chan{}", addr.port()),
            stream: Mutex::new(None),
            counter: AtomicU64::new(0),
            connections: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/new", head(new_channel))
            .route("/{channel}", get(subscribe))
            .with_state(Arc::clone(&state));

        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self {
            addr,
            state,
            _server: server,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn channel_url(&self) -> String {
        format!("{}/{}", self.url(), self.state.channel_id)
    }

    /// Number of subscribe requests served so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Write one frame to the live subscriber.
    pub fn emit(&self, data: &Value, event: &str) {
        self.state.write(event, data);
    }

    /// End the stream cleanly.
    pub fn close(&self) {
        drop(self.state.stream.lock().take());
    }

    /// Break the stream off mid-body.
    pub fn disconnect(&self) {
        if let Some(tx) = self.state.stream.lock().take() {
            let _ = tx.send(Err(io::Error::other("other side closed")));
        }
    }

    /// Wait until `n` subscribe requests have been served.
    pub async fn wait_for_connections(&self, n: usize) {
        wait_until(|| self.connections() >= n).await;
    }
}

async fn new_channel(State(state): State<Arc<RelayState>>) -> Response {
    (
        StatusCode::TEMPORARY_REDIRECT,
        [(
            header::LOCATION,
            format!("{}/{}", state.host, state.channel_id),
        )],
    )
        .into_response()
}

async fn subscribe(
    State(state): State<Arc<RelayState>>,
    Path(channel): Path<String>,
) -> Response {
    if channel != state.channel_id {
        return StatusCode::NOT_FOUND.into_response();
    }

    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(previous) = state.stream.lock().replace(tx) {
        let _ = previous.send(Ok(Bytes::from_static(b"event: close\ndata: {}\n\n")));
    }
    let _ = state.connections.fetch_add(1, Ordering::SeqCst);
    state.write("ready", &serde_json::json!({}));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(UnboundedReceiverStream::new(rx)),
    )
        .into_response()
}

/// A server that accepts connections and never answers.
pub struct SilentServer {
    addr: SocketAddr,
    _task: JoinHandle<()>,
}

impl SilentServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        Self { addr, _task: task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Forwarding target that accepts every `POST`.
pub async fn target_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

/// Number of requests the target has received.
pub async fn received(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

/// Poll `predicate` until it holds, panicking after [`TIMEOUT`].
pub async fn wait_until(mut predicate: impl FnMut() -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Wait until the target has received `n` requests.
pub async fn wait_for_requests(server: &MockServer, n: usize) {
    tokio::time::timeout(TIMEOUT, async {
        while received(server).await < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("target did not receive the expected requests");
}

/// Let in-flight work settle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
