use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::auth::TokenError;

/// Failure signals the gateway resolves locally. Backend-originated 4xx
/// responses are not errors from the gateway's point of view and pass
/// through untouched.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing Authorization header")]
    MissingAuthHeader,

    #[error("Authorization header must be of the form 'Bearer <token>'")]
    InvalidAuthFormat,

    #[error("authentication failed: {0}")]
    Token(#[from] TokenError),

    #[error("malformed request: {0}")]
    Validation(String),

    #[error("no route matches the request path")]
    NoRouteMatch,

    #[error("{service} is temporarily unavailable, please try again later")]
    BackendUnavailable { service: String },

    #[error("internal gateway error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingAuthHeader
            | GatewayError::InvalidAuthFormat
            | GatewayError::Token(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::NoRouteMatch => StatusCode::NOT_FOUND,
            GatewayError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Internal details are never exposed.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self, path: &str) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, path = %path, status = status.as_u16(), "gateway error");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error = %self, path = %path, "authentication failed");
        } else {
            tracing::debug!(error = %self, path = %path, status = status.as_u16(), "client error");
        }
    }

    /// Translate into the uniform JSON error envelope for `path`.
    pub fn into_response(self, path: &str) -> Response {
        self.log(path);
        let status = self.status_code();
        let envelope = ErrorEnvelope::new(status, self.client_message(), path);
        (status, axum::Json(envelope)).into_response()
    }
}

/// The single error shape every gateway-produced failure uses:
/// `{"timestamp", "status", "error", "message", "path"}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: String, path: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message,
            path: path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_has_exact_shape() {
        let envelope = ErrorEnvelope::new(
            StatusCode::UNAUTHORIZED,
            "missing Authorization header".to_string(),
            "/api/freelancers/42",
        );
        let value = serde_json::to_value(&envelope).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["error", "message", "path", "status", "timestamp"]);
        assert_eq!(value["status"], 401);
        assert_eq!(value["error"], "Unauthorized");
        assert_eq!(value["path"], "/api/freelancers/42");
    }

    #[test]
    fn internal_errors_never_leak_details() {
        let err = GatewayError::Internal("sqlx pool exhausted at backend".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn token_errors_identify_the_reason() {
        let expired = GatewayError::Token(crate::auth::TokenError::Expired);
        assert_eq!(expired.status_code(), StatusCode::UNAUTHORIZED);
        assert!(expired.client_message().contains("expired"));

        let invalid = GatewayError::Token(crate::auth::TokenError::InvalidSignature);
        assert!(invalid.client_message().contains("invalid"));
    }
}
