pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use gateway::dispatcher::route_request;
use gateway::middleware::{authenticate, request_logging};
use gateway::GatewayState;

/// Build the gateway router: health endpoints plus the catch-all dispatch,
/// wrapped in the filter chain (outermost first): trace -> request logging
/// -> authentication -> dispatch.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(health_check))
        .route("/health/live", get(health_check))
        .fallback(route_request)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging))
                .layer(middleware::from_fn_with_state(state.clone(), authenticate))
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
