// ============================================================================
// Dispatcher
// ============================================================================
//
// Terminal pipeline stage: resolve the route, gate on its circuit breaker,
// run the retry-wrapped proxy call, and record the logical outcome once.
// Backend responses below 500 pass through unchanged (4xx included); a 5xx
// that survives retries, a transport failure, or an open circuit produce
// the 503 fallback envelope.
//
// ============================================================================

use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{Request, State},
    response::Response,
};

use crate::config::MAX_REQUEST_BODY_SIZE;
use crate::error::GatewayError;
use crate::gateway::{retry, GatewayState};

pub async fn route_request(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    let route = match state.routes.resolve(&path) {
        Some(route) => route,
        None => return GatewayError::NoRouteMatch.into_response(&path),
    };

    let service_url = match state.discovery.service_url(route.service) {
        Ok(url) => url,
        Err(err) => {
            tracing::error!(error = %err, service = route.service, "service discovery failed");
            return GatewayError::Internal(err.to_string()).into_response(&path);
        }
    };

    let breaker = match state.breakers.get(route.id) {
        Some(breaker) => breaker,
        None => {
            return GatewayError::Internal(format!("no circuit breaker for route {}", route.id))
                .into_response(&path)
        }
    };

    let permit = match breaker.allow_request() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!(
                route = route.id,
                service = route.service,
                "circuit open, short-circuiting to fallback"
            );
            return fallback(route.service, &path);
        }
    };

    // Buffer the body once so retry attempts can replay it. The permit is
    // dropped unresolved here: the backend was never contacted.
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_REQUEST_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(err) => {
            drop(permit);
            return GatewayError::Validation(format!("failed to read request body: {}", err))
                .into_response(&path);
        }
    };

    let outcome = retry::execute(&route.retry, || {
        state.client.forward(&service_url, &parts, body.clone())
    })
    .await;

    match outcome {
        Ok(response) if response.status().is_server_error() => {
            permit.record_failure();
            tracing::warn!(
                route = route.id,
                service = route.service,
                status = response.status().as_u16(),
                "backend still failing after retries"
            );
            fallback(route.service, &path)
        }
        Ok(response) => {
            permit.record_success();
            response
        }
        Err(err) => {
            permit.record_failure();
            tracing::error!(
                error = %err,
                route = route.id,
                service = route.service,
                "backend call failed"
            );
            fallback(route.service, &path)
        }
    }
}

/// Canned 503 response for an unavailable backend.
fn fallback(service: &str, path: &str) -> Response {
    GatewayError::BackendUnavailable {
        service: format!("{}-service", service),
    }
    .into_response(path)
}
