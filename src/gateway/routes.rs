// ============================================================================
// Route Table
// ============================================================================
//
// Static mapping from URL path prefix to a named backend service plus the
// route's resilience policy. Built once at startup; read-only afterwards.
//
// Routing rules:
// - /api/users/**          → user-service
// - /api/freelancers/**    → freelancer-service
// - /api/projects/**       → project-service
// - /api/proposals/**      → project-service
// - /api/ai/**             → project-service
// - /api/payments/**       → payment-service
// - /api/notifications/**  → notification-service
//
// ============================================================================

use std::time::Duration;

use crate::config::Config;
use crate::gateway::circuit_breaker::CircuitBreakerConfig;
use crate::gateway::retry::RetryPolicy;

/// A configured mapping from a path prefix to a backend service pool.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: &'static str,
    pub prefix: &'static str,
    /// Service name resolved through `ServiceDiscovery`.
    pub service: &'static str,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryPolicy,
}

pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_config(config: &Config) -> Self {
        let circuit_breaker = CircuitBreakerConfig {
            failure_threshold: config.circuit_breaker.failure_threshold,
            open_duration: Duration::from_secs(config.circuit_breaker.open_duration_secs),
            half_open_max_trials: config.circuit_breaker.half_open_max_trials,
        };
        let retry = RetryPolicy {
            max_attempts: config.retry.max_attempts,
            retry_delay: Duration::from_millis(config.retry.retry_delay_ms),
        };

        let route = |id, prefix, service| Route {
            id,
            prefix,
            service,
            circuit_breaker: circuit_breaker.clone(),
            retry: retry.clone(),
        };

        Self {
            routes: vec![
                route("users", "/api/users", "user"),
                route("freelancers", "/api/freelancers", "freelancer"),
                route("projects", "/api/projects", "project"),
                route("proposals", "/api/proposals", "project"),
                route("ai", "/api/ai", "project"),
                route("payments", "/api/payments", "payment"),
                route("notifications", "/api/notifications", "notification"),
            ],
        }
    }

    /// Longest-prefix match for `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|route| {
                path == route.prefix
                    || path
                        .strip_prefix(route.prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|route| route.prefix.len())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
