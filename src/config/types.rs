//! Configuration types and defaults for relay.
//!
//! This module defines enums, constants, and default value functions
//! used by the Config struct.

use serde::{Deserialize, Serialize};

/// How outbound calls are admitted by the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPolicy {
    /// At most `rate_limit_max_calls` calls in any trailing window (default).
    #[default]
    SlidingWindow,
    /// One call at a time, with a minimum delay between call starts.
    Serialized,
}

impl RateLimitPolicy {
    /// Parse a rate limit policy from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sliding_window" => Some(Self::SlidingWindow),
            "serialized" => Some(Self::Serialized),
            _ => None,
        }
    }
}

/// Deadline class for a poll, from short fetch-style work to long executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutClass {
    /// Quick lookups such as listing issues.
    Fetch,
    /// Analysis and planning sessions (default).
    #[default]
    Analysis,
    /// Sessions that change code and open pull requests.
    Execution,
}

impl TimeoutClass {
    /// Parse a timeout class from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fetch" => Some(Self::Fetch),
            "analysis" => Some(Self::Analysis),
            "execution" => Some(Self::Execution),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeoutClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutClass::Fetch => write!(f, "fetch"),
            TimeoutClass::Analysis => write!(f, "analysis"),
            TimeoutClass::Execution => write!(f, "execution"),
        }
    }
}

/// Message sent to a session to ask it to stop.
pub const DEFAULT_CANCEL_MESSAGE: &str = "STOP: The user has cancelled this operation. \
Please stop what you are doing and mark the task as cancelled.";

// Default value functions for serde
pub(crate) fn default_api_base() -> String {
    "https://api.devin.ai/v1".to_string()
}
pub(crate) fn default_request_timeout_secs() -> u64 {
    60
}
pub(crate) fn default_rate_limit_max_calls() -> u32 {
    50
}
pub(crate) fn default_rate_limit_window_secs() -> u64 {
    60
}
pub(crate) fn default_rate_limit_min_interval_ms() -> u64 {
    1200
}
pub(crate) fn default_throttle_max_attempts() -> u32 {
    3
}
pub(crate) fn default_throttle_base_ms() -> u64 {
    2000
}
pub(crate) fn default_throttle_max_delay_ms() -> u64 {
    30_000
}
pub(crate) fn default_poll_initial_interval_secs() -> u64 {
    5
}
pub(crate) fn default_poll_max_interval_secs() -> u64 {
    30
}
pub(crate) fn default_poll_max_consecutive_failures() -> u32 {
    3
}
pub(crate) fn default_fetch_timeout_secs() -> u64 {
    120
}
pub(crate) fn default_analysis_timeout_secs() -> u64 {
    600
}
pub(crate) fn default_execution_timeout_secs() -> u64 {
    1800
}
pub(crate) fn default_cancel_max_attempts() -> u32 {
    30
}
pub(crate) fn default_cancel_retry_delay_secs() -> u64 {
    10
}
pub(crate) fn default_cancel_message() -> String {
    DEFAULT_CANCEL_MESSAGE.to_string()
}
pub(crate) fn default_max_workers() -> usize {
    4
}
