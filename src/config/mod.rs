//! Configuration model for relay.
//!
//! This module defines the Config struct that represents `{state_dir}/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, environment overrides for the
//! credentials, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use operations::{API_BASE_ENV, API_KEY_ENV};
pub use types::{RateLimitPolicy, TimeoutClass};
