//! Transports that carry step requests to the target service.
//!
//! Each virtual user gets its own transport from a [`TransportFactory`] when
//! its loop starts; the transport is dropped when the loop exits. Users never
//! share connections.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{StepError, SurgeError, SurgeResult};
use crate::request::{StepRequest, StepResponse};

/// Sends one request and returns the fully buffered response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: StepRequest) -> Result<StepResponse, StepError>;
}

/// Creates the private transport of one virtual user.
pub trait TransportFactory: Send + Sync {
    fn create(&self, user_id: u32) -> SurgeResult<Box<dyn Transport>>;
}

/// HTTP transport backed by a per-user `reqwest::Client`.
pub struct HttpTransport {
    client: reqwest::Client,
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: StepRequest) -> Result<StepResponse, StepError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(StepResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds one [`HttpTransport`] per user.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    timeout: Duration,
}

impl HttpTransportFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransportFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self, _user_id: u32) -> SurgeResult<Box<dyn Transport>> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SurgeError::Transport(e.to_string()))?;
        Ok(Box::new(HttpTransport { client }))
    }
}

/// What a stub transport does with every request.
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Answer with a fixed status and body
    Respond { status: u16, body: Bytes },
    /// Answer with the given status, echoing the request body
    Echo { status: u16 },
    /// Fail every request with this message
    Fail(String),
}

/// Deterministic in-process transport for dry runs and tests.
///
/// Every request takes `latency` (on the tokio clock) and then behaves as
/// configured. Sent requests are recorded per user.
#[derive(Debug, Clone)]
pub struct StubTransportFactory {
    behavior: StubBehavior,
    latency: Duration,
    created: Arc<AtomicUsize>,
    sent: Arc<Mutex<Vec<(u32, StepRequest)>>>,
}

impl StubTransportFactory {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            latency: Duration::ZERO,
            created: Arc::new(AtomicUsize::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer everything with `200` and an empty body.
    pub fn ok() -> Self {
        Self::respond(200, Bytes::new())
    }

    pub fn respond(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(StubBehavior::Respond {
            status,
            body: body.into(),
        })
    }

    pub fn echo(status: u16) -> Self {
        Self::new(StubBehavior::Echo { status })
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(StubBehavior::Fail(message.into()))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of transports handed out so far.
    pub fn transports_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Requests sent through any transport of this factory, with user ids.
    pub async fn sent_requests(&self) -> Vec<(u32, StepRequest)> {
        self.sent.lock().await.clone()
    }
}

impl TransportFactory for StubTransportFactory {
    fn create(&self, user_id: u32) -> SurgeResult<Box<dyn Transport>> {
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(StubTransport {
            user_id,
            behavior: self.behavior.clone(),
            latency: self.latency,
            sent: self.sent.clone(),
        }))
    }
}

struct StubTransport {
    user_id: u32,
    behavior: StubBehavior,
    latency: Duration,
    sent: Arc<Mutex<Vec<(u32, StepRequest)>>>,
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: StepRequest) -> Result<StepResponse, StepError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let echoed = request.body.clone().unwrap_or_default();
        self.sent.lock().await.push((self.user_id, request));

        match &self.behavior {
            StubBehavior::Respond { status, body } => Ok(StepResponse::new(*status, body.clone())),
            StubBehavior::Echo { status } => Ok(StepResponse::new(*status, echoed)),
            StubBehavior::Fail(message) => Err(StepError::Transport(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_respond() {
        let factory = StubTransportFactory::respond(404, "missing");
        let transport = factory.create(1).unwrap();
        let response = transport.send(StepRequest::get("http://x/a")).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.text(), "missing");
        assert_eq!(factory.transports_created(), 1);
    }

    #[tokio::test]
    async fn test_stub_echo_and_record() {
        let factory = StubTransportFactory::echo(201);
        let transport = factory.create(3).unwrap();
        let response = transport
            .send(StepRequest::post("http://x/b").with_body("ping"))
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.text(), "ping");

        let sent = factory.sent_requests().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 3);
        assert_eq!(sent[0].1.url, "http://x/b");
    }

    #[tokio::test]
    async fn test_stub_failing() {
        let factory = StubTransportFactory::failing("connection refused");
        let transport = factory.create(1).unwrap();
        let err = transport.send(StepRequest::get("http://x")).await.unwrap_err();
        assert_eq!(err, StepError::Transport("connection refused".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stub_latency_uses_tokio_clock() {
        let factory = StubTransportFactory::ok().with_latency(Duration::from_millis(250));
        let transport = factory.create(1).unwrap();
        let start = tokio::time::Instant::now();
        transport.send(StepRequest::get("http://x")).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn test_http_factory_creates_transport() {
        let factory = HttpTransportFactory::default();
        assert!(factory.create(1).is_ok());
    }
}
