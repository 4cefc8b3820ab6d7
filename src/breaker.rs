use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::job::Source;

/// Runtime circuit state for one collector's upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a probe request.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for BreakerInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

/// Thread-safe failure-isolation state machine, one per collector.
///
/// Closed: requests flow, failures count. Open: requests are refused until
/// the cooldown elapses. Half-open: exactly one probe is admitted; success
/// closes the circuit, failure reopens it.
#[derive(Debug)]
pub struct CircuitBreaker {
    source: Source,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(source: Source, config: BreakerConfig) -> Self {
        Self {
            source,
            config,
            inner: Mutex::new(BreakerInner::default()),
        }
    }

    /// Whether a request may proceed right now. An open circuit past its
    /// cooldown transitions to half-open and admits the caller as the probe.
    pub fn allow_request(&self) -> bool {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let can_probe = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.config.cooldown)
                    .unwrap_or(false);

                if can_probe {
                    tracing::info!(source = %self.source, "circuit breaker half-open, admitting probe");
                    inner.state = CircuitState::HalfOpen;
                    inner.opened_at = None;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        if inner.state != CircuitState::Closed {
            tracing::info!(source = %self.source, previous = %inner.state, "circuit breaker closed");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let should_open = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold;
        if should_open && inner.state != CircuitState::Open {
            tracing::warn!(
                source = %self.source,
                failures = inner.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "circuit breaker opened"
            );
        }
        if should_open {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            Source::Aggregator,
            BreakerConfig {
                failure_threshold: threshold,
                cooldown,
            },
        )
    }

    #[test]
    fn opens_after_threshold_failures() {
        let b = breaker(3, Duration::from_secs(60));

        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.allow_request());

        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.allow_request());
    }

    #[test]
    fn open_circuit_refuses_before_cooldown() {
        let b = breaker(1, Duration::from_secs(60));
        b.record_failure();

        assert!(!b.allow_request());
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[test]
    fn probe_after_cooldown_then_close_on_success() {
        let b = breaker(1, Duration::from_millis(5));
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(10));
        assert!(b.allow_request());
        assert_eq!(b.state(), CircuitState::HalfOpen);

        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 0);
    }

    #[test]
    fn failed_probe_reopens() {
        let b = breaker(1, Duration::from_millis(5));
        b.record_failure();

        std::thread::sleep(Duration::from_millis(10));
        assert!(b.allow_request());
        assert_eq!(b.state(), CircuitState::HalfOpen);

        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.allow_request());
    }
}
