//! A small HTTP service that load tests can be pointed at.
//!
//! Routes:
//! - `GET /items` - JSON document `{"id": 42, "name": "widget"}`
//! - `POST /echo` - echoes the request body and content type
//! - `GET /status/:code` - empty response with the given status
//! - `GET /slow/:ms` - waits `ms` milliseconds, then `200`
//! - `GET /secure` - `200` with `Authorization: Bearer letmein`, else `401`

use bytes::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Bearer token accepted by `/secure`.
pub const SECURE_TOKEN: &str = "letmein";

#[derive(Clone, Default)]
struct MockState {
    hits: Arc<AtomicU64>,
}

impl MockState {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Mock target bound to an ephemeral localhost port.
///
/// The server task is aborted when the value is dropped.
pub struct MockTarget {
    addr: SocketAddr,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockTarget {
    /// Bind and start serving.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = MockState::default();

        let app = Router::new()
            .route("/items", get(items))
            .route("/echo", post(echo))
            .route("/status/:code", get(status))
            .route("/slow/:ms", get(slow))
            .route("/secure", get(secure))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests served so far.
    pub fn hits(&self) -> u64 {
        self.state.hits.load(Ordering::Relaxed)
    }
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn items(State(state): State<MockState>) -> impl IntoResponse {
    state.hit();
    Json(serde_json::json!({"id": 42, "name": "widget"}))
}

async fn echo(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    state.hit();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn status(State(state): State<MockState>, Path(code): Path<u16>) -> StatusCode {
    state.hit();
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn slow(State(state): State<MockState>, Path(ms): Path<u64>) -> StatusCode {
    state.hit();
    tokio::time::sleep(Duration::from_millis(ms)).await;
    StatusCode::OK
}

async fn secure(State(state): State<MockState>, headers: HeaderMap) -> StatusCode {
    state.hit();
    let expected = format!("Bearer {}", SECURE_TOKEN);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => StatusCode::OK,
        _ => StatusCode::UNAUTHORIZED,
    }
}
