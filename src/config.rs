use anyhow::Result;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 10;

// Resilience defaults. Every value can be overridden through the environment.
const DEFAULT_CB_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_CB_OPEN_DURATION_SECS: u64 = 30;
const DEFAULT_CB_HALF_OPEN_MAX_TRIALS: u32 = 1;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 100;

const MIN_JWT_SECRET_LEN: usize = 32;

/// Maximum buffered request body. Bodies are buffered once so the retry
/// executor can replay them; anything larger is rejected up front.
pub const MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024; // 2 MB

// ============================================================================
// Configuration Structures
// ============================================================================

/// Base URLs of the backend services the gateway fronts.
#[derive(Clone, Debug)]
pub struct ServiceEndpoints {
    pub user_service_url: String,
    pub freelancer_service_url: String,
    pub project_service_url: String,
    pub payment_service_url: String,
    pub notification_service_url: String,
}

/// Per-route circuit breaker tuning, applied uniformly to every route.
#[derive(Clone, Debug)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub open_duration_secs: u64,
    pub half_open_max_trials: u32,
}

/// Retry tuning: total attempts (first call included) and the fixed delay
/// between attempts.
#[derive(Clone, Debug)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Shared secret for HMAC-SHA256 token verification.
    pub jwt_secret: String,
    pub rust_log: String,
    /// Whether to strip the original Authorization header before forwarding.
    /// The injected X-User-* headers are authoritative either way.
    pub strip_authorization: bool,
    pub service_timeout_secs: u64,
    /// Path prefixes exempt from authentication.
    pub public_prefixes: Vec<String>,
    pub services: ServiceEndpoints,
    pub circuit_breaker: CircuitBreakerSettings,
    pub retry: RetrySettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = std::env::var("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long. \
                 Generate one with: openssl rand -base64 32",
                MIN_JWT_SECRET_LEN
            );
        }

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            jwt_secret,
            rust_log: env_or("RUST_LOG", "info"),
            strip_authorization: env_parse("STRIP_AUTHORIZATION", false),
            service_timeout_secs: env_parse("SERVICE_TIMEOUT_SECS", DEFAULT_SERVICE_TIMEOUT_SECS),
            public_prefixes: std::env::var("PUBLIC_PATH_PREFIXES")
                .map(|raw| {
                    raw.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| default_public_prefixes()),
            services: ServiceEndpoints {
                user_service_url: env_or("USER_SERVICE_URL", "http://localhost:8081"),
                freelancer_service_url: env_or("FREELANCER_SERVICE_URL", "http://localhost:8082"),
                project_service_url: env_or("PROJECT_SERVICE_URL", "http://localhost:8083"),
                payment_service_url: env_or("PAYMENT_SERVICE_URL", "http://localhost:8084"),
                notification_service_url: env_or(
                    "NOTIFICATION_SERVICE_URL",
                    "http://localhost:8085",
                ),
            },
            circuit_breaker: CircuitBreakerSettings {
                failure_threshold: env_parse("CB_FAILURE_THRESHOLD", DEFAULT_CB_FAILURE_THRESHOLD),
                open_duration_secs: env_parse(
                    "CB_OPEN_DURATION_SECS",
                    DEFAULT_CB_OPEN_DURATION_SECS,
                ),
                half_open_max_trials: env_parse(
                    "CB_HALF_OPEN_MAX_TRIALS",
                    DEFAULT_CB_HALF_OPEN_MAX_TRIALS,
                ),
            },
            retry: RetrySettings {
                max_attempts: env_parse("RETRY_MAX_ATTEMPTS", DEFAULT_RETRY_MAX_ATTEMPTS),
                retry_delay_ms: env_parse("RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS),
            },
        })
    }

    /// Whether `path` falls under a public prefix (no authentication).
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Default public prefixes: registration, login, the public catalog views,
/// and the operational health paths.
pub fn default_public_prefixes() -> Vec<String> {
    [
        "/api/users/register",
        "/api/users/login",
        "/api/freelancers/public",
        "/api/projects/public",
        "/health",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_prefixes(prefixes: &[&str]) -> Config {
        Config {
            port: 0,
            jwt_secret: "x".repeat(MIN_JWT_SECRET_LEN),
            rust_log: "info".to_string(),
            strip_authorization: false,
            service_timeout_secs: 1,
            public_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            services: ServiceEndpoints {
                user_service_url: String::new(),
                freelancer_service_url: String::new(),
                project_service_url: String::new(),
                payment_service_url: String::new(),
                notification_service_url: String::new(),
            },
            circuit_breaker: CircuitBreakerSettings {
                failure_threshold: 5,
                open_duration_secs: 30,
                half_open_max_trials: 1,
            },
            retry: RetrySettings {
                max_attempts: 3,
                retry_delay_ms: 0,
            },
        }
    }

    #[test]
    fn public_path_matches_exact_and_subpaths() {
        let config = config_with_prefixes(&["/api/users/login", "/health"]);
        assert!(config.is_public_path("/api/users/login"));
        assert!(config.is_public_path("/health"));
        assert!(config.is_public_path("/health/ready"));
        assert!(!config.is_public_path("/api/users/loginx"));
        assert!(!config.is_public_path("/api/users/42"));
    }

    #[test]
    fn public_projects_subtree_is_public_but_rest_is_not() {
        let config = config_with_prefixes(&["/api/projects/public"]);
        assert!(config.is_public_path("/api/projects/public"));
        assert!(config.is_public_path("/api/projects/public/7"));
        assert!(!config.is_public_path("/api/projects/7"));
    }
}
