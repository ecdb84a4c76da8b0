//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for relay.
///
/// This struct represents the contents of `{state_dir}/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Remote service
    // =========================================================================
    /// Base URL of the remote session API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bearer token. `RELAY_API_KEY` takes precedence when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // =========================================================================
    // Rate limiting
    // =========================================================================
    /// Admission policy for outbound calls.
    #[serde(default)]
    pub rate_limit_policy: RateLimitPolicy,

    /// Call budget per window (sliding_window policy).
    #[serde(default = "default_rate_limit_max_calls")]
    pub rate_limit_max_calls: u32,

    /// Length of the trailing window (sliding_window policy).
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Minimum delay between call starts (serialized policy).
    #[serde(default = "default_rate_limit_min_interval_ms")]
    pub rate_limit_min_interval_ms: u64,

    /// Attempts made when the remote answers 429 before giving up.
    #[serde(default = "default_throttle_max_attempts")]
    pub throttle_max_attempts: u32,

    /// Backoff unit after a 429; the n-th retry waits `base * n`.
    #[serde(default = "default_throttle_base_ms")]
    pub throttle_base_ms: u64,

    /// Upper bound on a single 429 backoff.
    #[serde(default = "default_throttle_max_delay_ms")]
    pub throttle_max_delay_ms: u64,

    // =========================================================================
    // Polling
    // =========================================================================
    /// First delay between polls; doubles after every poll.
    #[serde(default = "default_poll_initial_interval_secs")]
    pub poll_initial_interval_secs: u64,

    /// Ceiling for the poll delay.
    #[serde(default = "default_poll_max_interval_secs")]
    pub poll_max_interval_secs: u64,

    /// Consecutive transport errors tolerated before giving up on a session.
    #[serde(default = "default_poll_max_consecutive_failures")]
    pub poll_max_consecutive_failures: u32,

    /// Deadline for fetch-style sessions.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Deadline for analysis and planning sessions.
    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_timeout_secs: u64,

    /// Deadline for execution sessions.
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    // =========================================================================
    // Cancellation
    // =========================================================================
    /// Delivery attempts for the stop message.
    #[serde(default = "default_cancel_max_attempts")]
    pub cancel_max_attempts: u32,

    /// Delay between stop-message attempts.
    #[serde(default = "default_cancel_retry_delay_secs")]
    pub cancel_retry_delay_secs: u64,

    /// Text of the stop message.
    #[serde(default = "default_cancel_message")]
    pub cancel_message: String,

    // =========================================================================
    // Workers
    // =========================================================================
    /// Maximum sessions driven concurrently by a batch run.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            rate_limit_policy: RateLimitPolicy::default(),
            rate_limit_max_calls: default_rate_limit_max_calls(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_min_interval_ms: default_rate_limit_min_interval_ms(),
            throttle_max_attempts: default_throttle_max_attempts(),
            throttle_base_ms: default_throttle_base_ms(),
            throttle_max_delay_ms: default_throttle_max_delay_ms(),
            poll_initial_interval_secs: default_poll_initial_interval_secs(),
            poll_max_interval_secs: default_poll_max_interval_secs(),
            poll_max_consecutive_failures: default_poll_max_consecutive_failures(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            analysis_timeout_secs: default_analysis_timeout_secs(),
            execution_timeout_secs: default_execution_timeout_secs(),
            cancel_max_attempts: default_cancel_max_attempts(),
            cancel_retry_delay_secs: default_cancel_retry_delay_secs(),
            cancel_message: default_cancel_message(),
            max_workers: default_max_workers(),
        }
    }
}
