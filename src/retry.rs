//! Named backoff policy shared by collectors and the persistence gateway.

use std::time::Duration;

use rand::Rng;

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay every attempt.
    Fixed { delay: Duration },
    /// `base * factor^attempt`, capped at `max`, with optional ±50% jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Backoff {
    /// Delay for a 0-based attempt number.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scaled = base.as_secs_f64() * factor.powi(attempt as i32);
                let capped = scaled.min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(capped);

                if jitter {
                    let half = (delay.as_millis() as f64 * 0.5) as u64;
                    if half > 0 {
                        let offset = rand::rng().random_range(0..=half * 2) as i64 - half as i64;
                        let total = delay.as_millis() as i64 + offset;
                        delay = Duration::from_millis(total.max(0) as u64);
                    }
                }

                delay
            }
        }
    }
}

/// Bounded retry policy: how many attempts, and how long between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never zero.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn exponential(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                base,
                factor: 2.0,
                max,
                jitter: true,
            },
        }
    }

    /// Whether another attempt is allowed after `attempt` (0-based) failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}
