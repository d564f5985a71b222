use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by a marketplace bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Stable identity of the caller (email).
    pub sub: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Single role string; forwarded comma-joined in X-User-Roles.
    pub role: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Display name; falls back to `sub` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Token validation failure modes. Closed set so every call site handles
/// each case explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("expired token")]
    Expired,
}

/// Verified caller identity, derived per-request from a valid token and
/// forwarded to backends as headers. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub expires_at: i64,
}

/// Local HMAC-SHA256 token verification against a pre-shared secret.
/// Pure function of (token, current time, secret); no network calls.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and expiry, then extract the identity claims.
    /// The signature is checked before any claim is trusted.
    pub fn validate(&self, token: &str) -> Result<AuthContext, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;

        // An expiry at exactly the current second is still rejected.
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(AuthContext {
            user_id: claims.user_id,
            username: claims.username.unwrap_or_else(|| claims.sub.clone()),
            email: claims.sub,
            roles: claims
                .role
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            expires_at: claims.exp,
        })
    }
}
