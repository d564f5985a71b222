// ============================================================================
// Edge Gateway
// ============================================================================
//
// Single entry point for all marketplace client requests:
// - bearer-token authentication and identity-header injection
// - longest-prefix routing to backend services
// - per-route circuit breaking and bounded retry
// - uniform JSON error envelope
//
// Stateless apart from the per-route circuit breakers; scales horizontally.
//
// ============================================================================

pub mod circuit_breaker;
pub mod discovery;
pub mod dispatcher;
pub mod middleware;
pub mod retry;
pub mod routes;
pub mod service_client;

use std::sync::Arc;

use crate::auth::TokenValidator;
use crate::config::Config;
use circuit_breaker::CircuitBreakerRegistry;
use discovery::{ServiceDiscovery, StaticServiceDiscovery};
use routes::RouteTable;
use service_client::ServiceClient;

/// Shared state for the request pipeline. Route table, breaker registry and
/// discovery are read-only after startup.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub validator: TokenValidator,
    pub routes: RouteTable,
    pub breakers: CircuitBreakerRegistry,
    pub discovery: Box<dyn ServiceDiscovery>,
    pub client: ServiceClient,
}

impl GatewayState {
    pub fn new(config: Arc<Config>) -> Self {
        let validator = TokenValidator::new(&config.jwt_secret);
        let routes = RouteTable::from_config(&config);
        let breakers = CircuitBreakerRegistry::from_routes(routes.routes());
        let discovery = Box::new(StaticServiceDiscovery::new(config.services.clone()));
        let client = ServiceClient::new(config.service_timeout_secs);

        Self {
            config,
            validator,
            routes,
            breakers,
            discovery,
            client,
        }
    }
}
