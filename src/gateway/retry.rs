// ============================================================================
// Retry Executor
// ============================================================================
//
// Bounded retry around a backend call. Retries only on 5xx responses or
// transient connectivity failures; anything else returns immediately. The
// caller records circuit-breaker accounting once, from the final outcome,
// so the breaker tracks logical requests rather than individual attempts.
//
// ============================================================================

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;

use crate::gateway::service_client::ProxyError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first call included.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

/// Invoke `call` up to `max_attempts` times, short-circuiting on the first
/// non-retryable result. Returns the final attempt's outcome unchanged.
pub async fn execute<F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<Response<Body>, ProxyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response<Body>, ProxyError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        let result = call().await;

        let retryable = match &result {
            Ok(response) => response.status().is_server_error(),
            Err(err) => err.is_transient(),
        };

        if !retryable || attempt >= max_attempts {
            return result;
        }

        tracing::debug!(attempt, max_attempts, "backend attempt failed, retrying");
        tokio::time::sleep(policy.retry_delay).await;
        attempt += 1;
    }
}
