// src/circuit_breaker.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Wraps the remote policy backend so repeated failures stop
// being retried on every call.
// Purpose: §4.5 / §8 invariant 6 — closed -> open after N consecutive
// failures, open for a fixed cool-off, then half-open for exactly one
// probe.
// Dependencies: orc-core::clock
// ============================================================================

//! ## Overview
//! State lives entirely in this struct; there is no shared global circuit
//! registry. `before_call` must be consulted before every attempt and its
//! result obeyed; `on_result` must be called after every attempt that was
//! actually made.

use std::sync::Mutex;

use orc_core::clock::Clock;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through normally.
    Closed,
    /// Calls are skipped without attempting the backend.
    Open,
    /// Exactly one probe call is permitted.
    HalfOpen,
}

/// Whether the caller should attempt the backend this time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    /// Proceed with the call.
    Allowed,
    /// Skip the call; the circuit is open.
    Skipped,
}

/// Name the `circuit_breaker_open{backend}` gauge is recorded under; this
/// breaker only ever wraps the remote policy backend.
const BACKEND_NAME: &str = "remote_http";

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at_ms: i64,
}

/// Circuit breaker around one backend.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cool_off_ms: i64,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker.
    #[must_use]
    pub fn new(failure_threshold: u32, cool_off_ms: i64) -> Self {
        orc_metrics::registry::circuit_breaker_open(BACKEND_NAME, false);
        Self {
            failure_threshold: failure_threshold.max(1),
            cool_off_ms,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at_ms: 0,
            }),
        }
    }

    /// Returns the current state, transitioning `open -> half_open` if the
    /// cool-off has elapsed.
    pub fn state(&self, clock: &dyn Clock) -> CircuitState {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if inner.state == CircuitState::Open && clock.now_ms() - inner.opened_at_ms >= self.cool_off_ms {
            inner.state = CircuitState::HalfOpen;
        }
        inner.state
    }

    /// Decides whether to attempt the backend now.
    pub fn before_call(&self, clock: &dyn Clock) -> Permit {
        match self.state(clock) {
            CircuitState::Closed | CircuitState::HalfOpen => Permit::Allowed,
            CircuitState::Open => Permit::Skipped,
        }
    }

    /// Records the outcome of an attempted call.
    pub fn on_result(&self, clock: &dyn Clock, success: bool) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if success {
            let was_open = inner.state != CircuitState::Closed;
            inner.state = CircuitState::Closed;
            inner.consecutive_failures = 0;
            if was_open {
                orc_metrics::registry::circuit_breaker_open(BACKEND_NAME, false);
            }
            return;
        }
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at_ms = clock.now_ms();
                inner.consecutive_failures = self.failure_threshold;
                orc_metrics::registry::circuit_breaker_open(BACKEND_NAME, true);
            }
            CircuitState::Closed | CircuitState::Open => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold && inner.state != CircuitState::Open {
                    inner.state = CircuitState::Open;
                    inner.opened_at_ms = clock.now_ms();
                    orc_metrics::registry::circuit_breaker_open(BACKEND_NAME, true);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CircuitBreaker;
    use super::CircuitState;
    use super::Permit;
    use orc_core::clock::FixedClock;

    #[test]
    fn opens_after_exactly_the_failure_threshold() {
        let clock = FixedClock::new(0);
        let breaker = CircuitBreaker::new(5, 60_000);
        for _ in 0..4 {
            breaker.on_result(&clock, false);
            assert_eq!(breaker.state(&clock), CircuitState::Closed);
        }
        breaker.on_result(&clock, false);
        assert_eq!(breaker.state(&clock), CircuitState::Open);
    }

    #[test]
    fn stays_open_for_the_cool_off_then_half_opens() {
        let clock = FixedClock::new(0);
        let breaker = CircuitBreaker::new(1, 60_000);
        breaker.on_result(&clock, false);
        assert_eq!(breaker.before_call(&clock), Permit::Skipped);
        clock.advance(59_999);
        assert_eq!(breaker.before_call(&clock), Permit::Skipped);
        clock.advance(1);
        assert_eq!(breaker.before_call(&clock), Permit::Allowed);
        assert_eq!(breaker.state(&clock), CircuitState::HalfOpen);
    }

    #[test]
    fn a_failed_probe_reopens_immediately() {
        let clock = FixedClock::new(0);
        let breaker = CircuitBreaker::new(1, 1_000);
        breaker.on_result(&clock, false);
        clock.advance(1_000);
        assert_eq!(breaker.before_call(&clock), Permit::Allowed);
        breaker.on_result(&clock, false);
        assert_eq!(breaker.state(&clock), CircuitState::Open);
    }

    #[test]
    fn a_successful_probe_closes_the_circuit() {
        let clock = FixedClock::new(0);
        let breaker = CircuitBreaker::new(1, 1_000);
        breaker.on_result(&clock, false);
        clock.advance(1_000);
        assert_eq!(breaker.before_call(&clock), Permit::Allowed);
        breaker.on_result(&clock, true);
        assert_eq!(breaker.state(&clock), CircuitState::Closed);
    }
}
