use crate::{byte_body, empty_body};
use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as seen by the stub, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedRequest {
    pub method: Method,
    pub path: String,
}

/// Status to answer per path and method.
/// Unknown paths get `404`, known paths with another method get `405`.
#[derive(Debug, Clone, Default)]
pub struct StubRoutes {
    routes: HashMap<String, HashMap<Method, StatusCode>>,
}

impl StubRoutes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, method: Method, path: &str, status: StatusCode) -> Self {
        self.routes
            .entry(path.to_string())
            .or_default()
            .insert(method, status);
        self
    }

    fn status_for(&self, method: &Method, path: &str) -> StatusCode {
        match self.routes.get(path) {
            Some(methods) => methods
                .get(method)
                .copied()
                .unwrap_or(StatusCode::METHOD_NOT_ALLOWED),
            None => StatusCode::NOT_FOUND,
        }
    }
}

struct StubState {
    routes: StubRoutes,
    received: Mutex<Vec<ReceivedRequest>>,
}

/// Minimal http1 server that records what it receives.
/// The accept loop is aborted when the server is dropped.
pub struct StubServer {
    local_addr: SocketAddr,
    state: Arc<StubState>,
    accept_loop: Option<JoinHandle<anyhow::Result<()>>>,
}

impl StubServer {
    pub async fn bind(addr: &str, routes: StubRoutes) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind stub server to {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read stub server address")?;
        let state = Arc::new(StubState {
            routes,
            received: Mutex::new(Vec::new()),
        });
        let accept_loop = tokio::spawn(accept_loop(listener, state.clone()));
        Ok(Self {
            local_addr,
            state,
            accept_loop: Some(accept_loop),
        })
    }

    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn base_uri(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    #[must_use]
    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.state
            .received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    /// Runs until the accept loop fails.
    pub async fn join(mut self) -> anyhow::Result<()> {
        match self.accept_loop.take() {
            Some(handle) => handle.await.context("Stub accept loop panicked")?,
            None => Ok(()),
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(handle) = self.accept_loop.take() {
            handle.abort();
        }
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<StubState>) -> anyhow::Result<()> {
    loop {
        let (tcp, peer) = listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        let tcp = TokioIo::new(tcp);
        let st = state.clone();
        tokio::task::spawn(async move {
            let conn = hyper::server::conn::http1::Builder::new()
                .serve_connection(tcp, service_fn(move |req| stub_service(st.clone(), req)));
            if let Err(e) = conn.await {
                tracing::debug!(%peer, error = %e, "stub connection closed with error");
            }
        });
    }
}

async fn stub_service<B>(
    state: Arc<StubState>,
    incoming: Request<B>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = incoming.method().clone();
    let path = incoming.uri().path().to_string();
    let status = state.routes.status_for(&method, &path);
    tracing::debug!(%method, %path, %status, "stub request");
    if let Ok(mut received) = state.received.lock() {
        received.push(ReceivedRequest { method, path });
    }
    let body = match status.canonical_reason() {
        Some(reason) => byte_body(reason),
        None => empty_body(),
    };
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    Ok(resp)
}
