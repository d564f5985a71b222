use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use lancegate::auth::Claims;
use lancegate::config::{
    default_public_prefixes, CircuitBreakerSettings, Config, RetrySettings, ServiceEndpoints,
};
use lancegate::gateway::GatewayState;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// A stub backend service: counts hits, answers with a programmable status,
/// and echoes the gateway-injected headers back as `x-echo-*` response
/// headers so tests can assert what the backend actually received.
pub struct StubBackend {
    pub url: String,
    hits: Arc<AtomicUsize>,
    status: Arc<AtomicU16>,
}

impl StubBackend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct StubState {
    hits: Arc<AtomicUsize>,
    status: Arc<AtomicU16>,
}

const ECHOED_HEADERS: [&str; 6] = [
    "x-user-id",
    "x-username",
    "x-user-email",
    "x-user-roles",
    "x-request-id",
    "authorization",
];

async fn stub_handler(State(state): State<StubState>, request: Request) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap();

    let mut response = (status, "stub-body").into_response();
    for name in ECHOED_HEADERS {
        if let Some(value) = request.headers().get(name) {
            let echo = HeaderName::from_bytes(format!("x-echo-{}", name).as_bytes()).unwrap();
            response.headers_mut().insert(echo, value.clone());
        }
    }
    response
}

pub async fn spawn_backend(initial_status: u16) -> StubBackend {
    let hits = Arc::new(AtomicUsize::new(0));
    let status = Arc::new(AtomicU16::new(initial_status));
    let app = Router::new()
        .fallback(stub_handler)
        .with_state(StubState {
            hits: hits.clone(),
            status: status.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubBackend {
        url: format!("http://{}", addr),
        hits,
        status,
    }
}

pub fn default_cb() -> CircuitBreakerSettings {
    CircuitBreakerSettings {
        failure_threshold: 5,
        open_duration_secs: 60,
        half_open_max_trials: 1,
    }
}

pub fn default_retry() -> RetrySettings {
    RetrySettings {
        max_attempts: 3,
        retry_delay_ms: 1,
    }
}

/// Gateway config with every service pointed at the same stub backend.
pub fn test_config(
    backend_url: &str,
    circuit_breaker: CircuitBreakerSettings,
    retry: RetrySettings,
) -> Config {
    Config {
        port: 0,
        jwt_secret: TEST_SECRET.to_string(),
        rust_log: "info".to_string(),
        strip_authorization: false,
        service_timeout_secs: 5,
        public_prefixes: default_public_prefixes(),
        services: ServiceEndpoints {
            user_service_url: backend_url.to_string(),
            freelancer_service_url: backend_url.to_string(),
            project_service_url: backend_url.to_string(),
            payment_service_url: backend_url.to_string(),
            notification_service_url: backend_url.to_string(),
        },
        circuit_breaker,
        retry,
    }
}

/// Spawn the real gateway router on an ephemeral port, returning its URL.
pub async fn spawn_gateway(config: Config) -> String {
    let state = Arc::new(GatewayState::new(Arc::new(config)));
    let app = lancegate::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn mint_token(
    user_id: i64,
    email: &str,
    role: &str,
    exp_offset_secs: i64,
    secret: &str,
) -> String {
    let claims = Claims {
        sub: email.to_string(),
        user_id,
        role: role.to_string(),
        exp: Utc::now().timestamp() + exp_offset_secs,
        username: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
