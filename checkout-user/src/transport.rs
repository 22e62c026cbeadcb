use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use http_test_util::drain::DrainBodyFuture;
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Sends one request and drains its response.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request<Full<Bytes>>) -> TransportFuture<'_>;
}

#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: Request<Full<Bytes>>) -> TransportFuture<'_> {
        Box::pin(async move {
            let resp = self
                .client
                .request(request)
                .await
                .context("Failed to send request")?;
            let status = resp.status();
            let content_length: usize = resp
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|hv| hv.to_str().ok())
                .and_then(|hv| hv.parse().ok())
                .unwrap_or(1024);
            let body = DrainBodyFuture::new_trusted_length(resp.into_body(), content_length)
                .await
                .context("Failed to read response body")?;
            Ok(TransportResponse { status, body })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    pub method: Method,
    pub uri: Uri,
}

impl std::fmt::Display for CapturedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}

/// In-memory transport that keeps every outbound request and answers
/// with a fixed status. Backs `--dry-run` and the tests.
#[derive(Clone)]
pub struct RecordingTransport {
    status: StatusCode,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::with_status(StatusCode::OK)
    }

    #[must_use]
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.captured
            .lock()
            .map(|captured| captured.clone())
            .unwrap_or_default()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: Request<Full<Bytes>>) -> TransportFuture<'_> {
        let captured = CapturedRequest {
            method: request.method().clone(),
            uri: request.uri().clone(),
        };
        Box::pin(async move {
            self.captured
                .lock()
                .map_err(|_| anyhow::anyhow!("Recording transport lock poisoned"))?
                .push(captured);
            Ok(TransportResponse {
                status: self.status,
                body: Vec::new(),
            })
        })
    }
}
