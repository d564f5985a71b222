// ============================================================================
// Service Client
// ============================================================================
//
// HTTP client for forwarding requests to backend services. The inbound body
// is buffered once by the dispatcher and passed in as `Bytes`, so the retry
// executor can replay the same call.
//
// ============================================================================

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, Response};
use bytes::Bytes;
use thiserror::Error;

/// Proxy-level failure. Transient failures (connect refused, timeout) are
/// eligible for retry; fatal ones are not.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("backend connection failed: {0}")]
    Transient(String),
    #[error("backend call failed: {0}")]
    Fatal(String),
}

impl ProxyError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProxyError::Transient(_))
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ProxyError::Transient(err.to_string())
        } else {
            ProxyError::Fatal(err.to_string())
        }
    }
}

/// HTTP client for the proxied calls, with pooling and keep-alive.
pub struct ServiceClient {
    client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Forward one attempt to `service_url`, preserving method, path, query,
    /// headers (minus Host) and the buffered body.
    pub async fn forward(
        &self,
        service_url: &str,
        parts: &Parts,
        body: Bytes,
    ) -> Result<Response<Body>, ProxyError> {
        let path = parts.uri.path();
        let target_url = match parts.uri.query() {
            Some(query) => format!("{}{}?{}", service_url, path, query),
            None => format!("{}{}", service_url, path),
        };

        let mut headers = parts.headers.clone();
        headers.remove(header::HOST);

        let mut request = self
            .client
            .request(parts.method.clone(), &target_url)
            .headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        let upstream = request.send().await.map_err(ProxyError::from_reqwest)?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let body_bytes = upstream.bytes().await.map_err(ProxyError::from_reqwest)?;

        let mut response = Response::new(Body::from(body_bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

// The body is re-framed when we relay it, so connection-scoped headers from
// the upstream response must not be copied through.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    headers.remove(header::CONNECTION);
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove(header::UPGRADE);
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}
