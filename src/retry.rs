//! Retry and backoff policy shared by the transport, the poller and the
//! cancellation controller.
//!
//! A [`Backoff`] maps a zero-based retry number to a delay. A [`RetryPolicy`]
//! pairs a backoff with an attempt budget and runs an operation until it
//! succeeds, fails with a non-retryable error, or runs out of attempts.

use crate::error::Result;
use std::time::Duration;
use tracing::debug;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay every time.
    Fixed(Duration),
    /// `base * (retry + 1)`, capped.
    Linear { base: Duration, cap: Duration },
    /// `initial * 2^retry`, capped.
    Exponential { initial: Duration, cap: Duration },
}

impl Backoff {
    /// Delay before the retry numbered `retry` (0 for the first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Linear { base, cap } => base.saturating_mul(retry.saturating_add(1)).min(cap),
            Backoff::Exponential { initial, cap } => {
                let factor = 1u32.checked_shl(retry.min(31)).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(cap)
            }
        }
    }
}

/// Bounded retry: at most `max_attempts` calls, sleeping per `backoff` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run `op` until it succeeds or the budget is spent.
    ///
    /// `op` receives the one-based attempt number. Errors for which
    /// `retryable` returns false are returned immediately; otherwise the last
    /// error is returned once all attempts have failed.
    pub fn run<T, F, R>(&self, mut op: F, retryable: R) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
        R: Fn(&crate::error::RelayError) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    let delay = self.backoff.delay(attempt - 1);
                    debug!(attempt, ?delay, error = %err, "retrying after error");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
