//! Bounded retry with backoff.
//!
//! Replaces ad-hoc fixed-interval readiness polling: an operation is
//! attempted at most `max_attempts` times and the final error is
//! returned to the caller instead of looping forever. Every failed
//! attempt is reported through an observer callback.

use std::future::Future;
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the first re-attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failure. 1.0 gives a
    /// fixed-interval poll.
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted. `on_failure`
/// observes every failed attempt (1-based) before the next delay.
pub async fn retry_with_backoff<T, E, F, Fut, O>(
    policy: RetryPolicy,
    mut op: F,
    mut on_failure: O,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(u32, &E),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                on_failure(attempt, &e);
                if attempt >= max_attempts {
                    return Err(e);
                }
            }
        }

        tokio::time::sleep(delay).await;
        // Clamp in float space; a runaway factor would overflow the
        // Duration constructor before a Duration-level min applied.
        let next = (delay.as_secs_f64() * policy.backoff_factor)
            .min(policy.max_delay.as_secs_f64());
        delay = Duration::from_secs_f64(next);
    }
}
