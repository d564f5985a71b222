// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Per-route circuit breaker. Stops sending traffic to a failing backend for
// a cooldown period instead of letting failures cascade.
//
// States:
// - Closed: normal operation, requests pass through
// - Open: backend is failing, requests are short-circuited to the fallback
// - Half-Open: a capped number of trial requests probe for recovery
//
// ============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::gateway::routes::Route;

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive logical failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing trials.
    pub open_duration: Duration,
    /// Maximum concurrent half-open trial requests.
    pub half_open_max_trials: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
}

#[derive(Debug, Error)]
pub enum CircuitBreakerError {
    #[error("circuit breaker is open, backend is unavailable")]
    CircuitOpen,
}

/// One breaker per route, shared by every concurrent request to that route.
/// All state lives behind a single mutex so transitions are linearizable;
/// the lock is held only for the transition, never across backend I/O.
pub struct CircuitBreaker {
    route: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(route: impl Into<String>, config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            route: route.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_in_flight: 0,
            }),
        })
    }

    /// Decide whether a request may proceed. On success the caller receives
    /// a permit that must be resolved with `record_success` or
    /// `record_failure` once per logical request; dropping it unresolved
    /// (client disconnect) releases a half-open trial slot without
    /// recording an outcome.
    pub fn allow_request(self: &Arc<Self>) -> Result<RequestPermit, CircuitBreakerError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(self.permit(false)),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.open_duration)
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_in_flight = 1;
                    tracing::info!(route = %self.route, "circuit breaker transitioning to half-open");
                    Ok(self.permit(true))
                } else {
                    Err(CircuitBreakerError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_max_trials {
                    inner.half_open_in_flight += 1;
                    Ok(self.permit(true))
                } else {
                    Err(CircuitBreakerError::CircuitOpen)
                }
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn permit(self: &Arc<Self>, trial: bool) -> RequestPermit {
        RequestPermit {
            breaker: Arc::clone(self),
            trial,
            resolved: false,
        }
    }

    fn on_success(&self, _trial: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.half_open_in_flight = 0;
                tracing::info!(route = %self.route, "circuit breaker closed after successful trial");
            }
            // A concurrent trial already reopened the circuit; its verdict
            // stands until the next cooldown.
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, _trial: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        route = %self.route,
                        failures = inner.consecutive_failures,
                        threshold = self.config.failure_threshold,
                        "circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_in_flight = 0;
                tracing::warn!(route = %self.route, "circuit breaker reopened after failed trial");
            }
            CircuitState::Open => {}
        }
    }

    fn on_abandon(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Passage through the breaker for one logical request. The retry executor
/// may make several attempts under a single permit; the breaker only learns
/// the final outcome.
pub struct RequestPermit {
    breaker: Arc<CircuitBreaker>,
    trial: bool,
    resolved: bool,
}

impl RequestPermit {
    pub fn record_success(mut self) {
        self.resolved = true;
        self.breaker.on_success(self.trial);
    }

    pub fn record_failure(mut self) {
        self.resolved = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for RequestPermit {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.on_abandon(self.trial);
        }
    }
}

/// One breaker per route, built once at startup. The map itself is
/// read-only and needs no synchronization.
pub struct CircuitBreakerRegistry {
    breakers: HashMap<&'static str, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn from_routes(routes: &[Route]) -> Self {
        let breakers = routes
            .iter()
            .map(|route| {
                (
                    route.id,
                    CircuitBreaker::new(route.id, route.circuit_breaker.clone()),
                )
            })
            .collect();
        Self { breakers }
    }

    pub fn get(&self, route_id: &str) -> Option<&Arc<CircuitBreaker>> {
        self.breakers.get(route_id)
    }
}
