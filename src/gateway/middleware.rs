// ============================================================================
// Gateway Middleware
// ============================================================================
//
// - request_logging: one entry event, one completion event with terminal
//   status and latency. Short-circuit responses from later stages still
//   pass through here, so every request is logged exactly once.
// - authenticate: bearer-token verification and identity-header injection.
//   Gateway is the single point of authentication; backends trust the
//   propagated headers, not the raw token.
//
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::gateway::GatewayState;

// Identity headers injected after verification.
pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USERNAME: &str = "x-username";
pub const HEADER_USER_EMAIL: &str = "x-user-email";
pub const HEADER_USER_ROLES: &str = "x-user-roles";
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Request logging middleware.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    tracing::debug!(method = %method, path = %path, "incoming request");

    let response = next.run(req).await;

    let status = response.status();
    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

/// Authentication filter.
///
/// Public-prefix paths pass through unchanged. Everything else requires
/// `Authorization: Bearer <token>`; on success the verified identity is
/// injected as X-User-* headers before forwarding downstream.
pub async fn authenticate(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Request ID for tracing, added for public endpoints too.
    let request_id = Uuid::new_v4().to_string();
    insert_header(request.headers_mut(), HEADER_REQUEST_ID, &request_id);

    if state.config.is_public_path(&path) {
        return next.run(request).await;
    }

    let auth_header = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(value) => value.to_string(),
        None => return GatewayError::MissingAuthHeader.into_response(&path),
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => token,
        _ => return GatewayError::InvalidAuthFormat.into_response(&path),
    };

    let identity = match state.validator.validate(token) {
        Ok(identity) => identity,
        Err(err) => return GatewayError::Token(err).into_response(&path),
    };

    // Always overwrite: inbound copies of these headers are never trusted.
    let headers = request.headers_mut();
    insert_header(headers, HEADER_USER_ID, &identity.user_id.to_string());
    insert_header(headers, HEADER_USERNAME, &identity.username);
    insert_header(headers, HEADER_USER_EMAIL, &identity.email);
    insert_header(headers, HEADER_USER_ROLES, &identity.roles.join(","));

    if state.config.strip_authorization {
        headers.remove(AUTHORIZATION);
    }

    tracing::debug!(
        user_id = identity.user_id,
        request_id = %request_id,
        path = %path,
        "token verified, identity headers injected"
    );

    next.run(request).await
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
