//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::TimeoutClass;
use crate::error::{RelayError, Result};
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `api_key`.
pub const API_KEY_ENV: &str = "RELAY_API_KEY";

/// Environment variable that overrides `api_base`.
pub const API_BASE_ENV: &str = "RELAY_API_BASE";

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(RelayError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when the file
    /// does not exist. Environment overrides are applied in both cases.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| RelayError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            RelayError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Replace `api_key` and `api_base` with `RELAY_API_KEY` / `RELAY_API_BASE`
    /// when those are set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.api_key = Some(key.trim().to_string());
        }
        if let Ok(base) = std::env::var(API_BASE_ENV)
            && !base.trim().is_empty()
        {
            self.api_base = base.trim().to_string();
        }
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `api_base` must be an http(s) URL
    /// - budgets, attempt counts and intervals must be positive
    /// - `poll_initial_interval_secs` must not exceed `poll_max_interval_secs`
    /// - `max_workers` must be between 1 and 16
    pub fn validate(&self) -> Result<()> {
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(invalid(format!(
                "api_base must start with http:// or https:// (found '{}')",
                self.api_base
            )));
        }

        let positive: [(&str, u64); 14] = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("rate_limit_max_calls", self.rate_limit_max_calls as u64),
            ("rate_limit_window_secs", self.rate_limit_window_secs),
            ("rate_limit_min_interval_ms", self.rate_limit_min_interval_ms),
            ("throttle_max_attempts", self.throttle_max_attempts as u64),
            ("throttle_base_ms", self.throttle_base_ms),
            ("poll_initial_interval_secs", self.poll_initial_interval_secs),
            ("poll_max_interval_secs", self.poll_max_interval_secs),
            (
                "poll_max_consecutive_failures",
                self.poll_max_consecutive_failures as u64,
            ),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("analysis_timeout_secs", self.analysis_timeout_secs),
            ("execution_timeout_secs", self.execution_timeout_secs),
            ("cancel_max_attempts", self.cancel_max_attempts as u64),
            ("cancel_retry_delay_secs", self.cancel_retry_delay_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(invalid(format!("{} must be greater than 0", name)));
            }
        }

        if self.throttle_max_delay_ms < self.throttle_base_ms {
            return Err(invalid(
                "throttle_max_delay_ms must be at least throttle_base_ms".to_string(),
            ));
        }

        if self.poll_initial_interval_secs > self.poll_max_interval_secs {
            return Err(invalid(
                "poll_initial_interval_secs must not exceed poll_max_interval_secs".to_string(),
            ));
        }

        if !(1..=16).contains(&self.max_workers) {
            return Err(invalid(format!(
                "max_workers must be between 1 and 16 (found {})",
                self.max_workers
            )));
        }

        if self.cancel_message.trim().is_empty() {
            return Err(invalid("cancel_message must be non-empty".to_string()));
        }

        Ok(())
    }

    /// The bearer token, or a user error explaining how to provide one.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                RelayError::UserError(format!(
                    "no API key configured\n\
                     Fix: set {} or add `api_key` to config.yaml.",
                    API_KEY_ENV
                ))
            })
    }

    /// Poll deadline for a class of session.
    pub fn timeout_for(&self, class: TimeoutClass) -> Duration {
        let secs = match class {
            TimeoutClass::Fetch => self.fetch_timeout_secs,
            TimeoutClass::Analysis => self.analysis_timeout_secs,
            TimeoutClass::Execution => self.execution_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn invalid(message: String) -> RelayError {
    RelayError::UserError(format!("config validation failed: {}", message))
}
