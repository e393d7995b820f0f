//! Bounded retry with exponential backoff.
//!
//! # Invariants
//! - At most `max_attempts` calls are made; the last error is returned as-is.
//! - The delay before attempt `n + 1` is `base_delay * 2^(n - 1)`.
//! - Errors the classifier rejects are returned immediately.

use log::{error, warn};
use std::fmt::Display;
use std::time::Duration;

/// Retry budget for operations that may hit transient storage contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Runs `operation` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// Blocks the calling thread between attempts; call from a blocking
    /// context (e.g. `spawn_blocking`), never directly on an async executor.
    pub fn run<T, E, F>(
        &self,
        label: &str,
        is_retryable: impl Fn(&E) -> bool,
        mut operation: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if !is_retryable(&err) => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    error!(
                        "event=retry module=retry status=error op={} attempt={}/{} error={}",
                        label, attempt, max_attempts, err
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "event=retry module=retry status=retry op={} attempt={}/{} delay_ms={} error={}",
                        label,
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        err
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
