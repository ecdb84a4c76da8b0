//! Outbound call budget shared by every thread that talks to the remote service.
//!
//! Two admission policies are supported:
//!
//! - **Sliding window**: at most `budget` calls in any trailing `window`. The
//!   lock guards only the evict/check/record step; a caller that finds the
//!   window full sleeps outside the lock until the oldest call ages out.
//! - **Serialized**: one call at a time. The returned [`Permit`] holds the lock
//!   for the duration of the call, and consecutive call starts are at least
//!   `min_interval` apart.
//!
//! The limiter is an ordinary value. Share it with `Arc<RateLimiter>`; tests
//! construct independent instances.

use crate::config::{Config, RateLimitPolicy};
use crate::error::{RelayError, Result};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

pub struct RateLimiter {
    mode: Mode,
}

enum Mode {
    SlidingWindow {
        budget: usize,
        window: Duration,
        calls: Mutex<VecDeque<Instant>>,
    },
    Serialized {
        min_interval: Duration,
        last_start: Mutex<Option<Instant>>,
    },
}

/// Proof that a call was admitted.
///
/// Under the serialized policy the permit keeps other callers out until it is
/// dropped, so hold it for the whole request.
pub struct Permit<'a> {
    admitted_at: Instant,
    _serial: Option<MutexGuard<'a, Option<Instant>>>,
}

impl Permit<'_> {
    /// The instant recorded for this call.
    pub fn admitted_at(&self) -> Instant {
        self.admitted_at
    }
}

impl RateLimiter {
    /// At most `budget` calls per trailing `window`.
    pub fn sliding_window(budget: u32, window: Duration) -> Result<Self> {
        if budget == 0 {
            return Err(RelayError::UserError(
                "rate limit budget must be greater than 0".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(RelayError::UserError(
                "rate limit window must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            mode: Mode::SlidingWindow {
                budget: budget as usize,
                window,
                calls: Mutex::new(VecDeque::with_capacity(budget as usize)),
            },
        })
    }

    /// One call at a time, starts spaced by at least `min_interval`.
    pub fn serialized(min_interval: Duration) -> Result<Self> {
        if min_interval.is_zero() {
            return Err(RelayError::UserError(
                "rate limit min interval must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            mode: Mode::Serialized {
                min_interval,
                last_start: Mutex::new(None),
            },
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        match config.rate_limit_policy {
            RateLimitPolicy::SlidingWindow => Self::sliding_window(
                config.rate_limit_max_calls,
                Duration::from_secs(config.rate_limit_window_secs),
            ),
            RateLimitPolicy::Serialized => {
                Self::serialized(Duration::from_millis(config.rate_limit_min_interval_ms))
            }
        }
    }

    /// Block until one call may be issued, record it, and return a permit.
    ///
    /// Never gives up: every caller is eventually admitted.
    pub fn acquire(&self) -> Permit<'_> {
        match &self.mode {
            Mode::SlidingWindow {
                budget,
                window,
                calls,
            } => loop {
                let wait = {
                    let mut calls = lock(calls);
                    let now = Instant::now();
                    while let Some(&oldest) = calls.front() {
                        if now.duration_since(oldest) >= *window {
                            calls.pop_front();
                        } else {
                            break;
                        }
                    }
                    if calls.len() < *budget {
                        calls.push_back(now);
                        return Permit {
                            admitted_at: now,
                            _serial: None,
                        };
                    }
                    // Window is full: the front entry is the next to expire.
                    match calls.front() {
                        Some(&oldest) => (oldest + *window).saturating_duration_since(now),
                        None => Duration::ZERO,
                    }
                };
                debug!(?wait, "rate limit window full, waiting");
                std::thread::sleep(wait);
            },
            Mode::Serialized {
                min_interval,
                last_start,
            } => {
                let mut guard = lock(last_start);
                if let Some(prev) = *guard {
                    let ready_at = prev + *min_interval;
                    let now = Instant::now();
                    if ready_at > now {
                        std::thread::sleep(ready_at - now);
                    }
                }
                let now = Instant::now();
                *guard = Some(now);
                Permit {
                    admitted_at: now,
                    _serial: Some(guard),
                }
            }
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.mode {
            Mode::SlidingWindow { budget, window, .. } => f
                .debug_struct("RateLimiter")
                .field("policy", &"sliding_window")
                .field("budget", budget)
                .field("window", window)
                .finish(),
            Mode::Serialized { min_interval, .. } => f
                .debug_struct("RateLimiter")
                .field("policy", &"serialized")
                .field("min_interval", min_interval)
                .finish(),
        }
    }
}

// A panic while holding the lock cannot leave the queue half-updated, so
// recover the guard instead of propagating the poison.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}
