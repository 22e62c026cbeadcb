use crate::error::RequestError;
use crate::statistics::{RequestRecord, RequestStats};
use crate::transport::Transport;
use http_test_util::empty_body;
use hyper::{Method, Request, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Client handed to each simulated user. Relative paths are resolved
/// against the base address and every request is folded into the user's stats.
pub struct HttpClient {
    base_address: Arc<str>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    stats: RequestStats,
}

impl HttpClient {
    #[must_use]
    pub fn new(base_address: Arc<str>, transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            base_address,
            transport,
            timeout,
            stats: RequestStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        resolve(&self.base_address, path)
    }

    pub async fn get(&mut self, path: &str) -> Result<Response, RequestError> {
        self.request(Method::GET, path).await
    }

    pub async fn request(&mut self, method: Method, path: &str) -> Result<Response, RequestError> {
        let (rtt, result) = run_timed(self.send(method.clone(), path)).await;
        self.stats
            .record(&RequestRecord::from_result(method, path, rtt, &result));
        result
    }

    async fn send(&self, method: Method, path: &str) -> Result<Response, RequestError> {
        let uri = self.url(path);
        let request = Request::builder()
            .method(method)
            .uri(uri.as_str())
            .body(empty_body())
            .map_err(|e| RequestError::InvalidUri {
                uri: uri.clone(),
                source: e.into(),
            })?;
        let resp = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| RequestError::Timeout(self.timeout))?
            .map_err(RequestError::Transport)?;
        if !resp.status.is_success() {
            return Err(RequestError::Status(resp.status));
        }
        Ok(Response {
            status: resp.status,
            body: resp.body,
        })
    }

    /// Hands the collected stats to the caller and starts from zero.
    pub fn take_stats(&mut self) -> RequestStats {
        std::mem::take(&mut self.stats)
    }
}

/// Joins a base origin and a relative path with exactly one `/` between them.
#[must_use]
pub fn resolve(base_address: &str, path: &str) -> String {
    let base = base_address.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[inline]
async fn run_timed<T, F: Future<Output = T>>(fut: F) -> (Duration, T) {
    let start = Instant::now();
    let res = fut.await;
    (start.elapsed(), res)
}
