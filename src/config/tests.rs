//! Tests for config functionality.

use crate::config::types::DEFAULT_CANCEL_MESSAGE;
use crate::config::{API_BASE_ENV, API_KEY_ENV, Config, RateLimitPolicy, TimeoutClass};
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.api_base, "https://api.devin.ai/v1");
    assert!(config.api_key.is_none());
    assert_eq!(config.rate_limit_policy, RateLimitPolicy::SlidingWindow);
    assert_eq!(config.rate_limit_max_calls, 50);
    assert_eq!(config.rate_limit_window_secs, 60);
    assert_eq!(config.throttle_max_attempts, 3);
    assert_eq!(config.poll_initial_interval_secs, 5);
    assert_eq!(config.poll_max_interval_secs, 30);
    assert_eq!(config.poll_max_consecutive_failures, 3);
    assert_eq!(config.cancel_max_attempts, 30);
    assert_eq!(config.cancel_retry_delay_secs, 10);
    assert_eq!(config.cancel_message, DEFAULT_CANCEL_MESSAGE);
    assert_eq!(config.max_workers, 4);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    assert_eq!(config.rate_limit_max_calls, 50);
    assert_eq!(config.execution_timeout_secs, 1800);
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
rate_limit_policy: serialized
rate_limit_min_interval_ms: 500
max_workers: 2
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.rate_limit_policy, RateLimitPolicy::Serialized);
    assert_eq!(config.rate_limit_min_interval_ms, 500);
    assert_eq!(config.max_workers, 2);

    // Unspecified values keep their defaults
    assert_eq!(config.fetch_timeout_secs, 120);
    assert_eq!(config.api_base, "https://api.devin.ai/v1");
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
max_workers: 3
some_future_setting: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.max_workers, 3);
}

#[test]
fn test_invalid_yaml_is_user_error() {
    let result = Config::from_yaml("max_workers: [not, a, number]");
    let err = result.unwrap_err().to_string();
    assert!(err.contains("failed to parse config YAML"));
}

#[test]
fn test_zero_budget_rejected() {
    let result = Config::from_yaml("rate_limit_max_calls: 0");
    let err = result.unwrap_err().to_string();
    assert!(err.contains("rate_limit_max_calls must be greater than 0"));
}

#[test]
fn test_initial_interval_above_max_rejected() {
    let yaml = r#"
poll_initial_interval_secs: 60
poll_max_interval_secs: 30
"#;
    let err = Config::from_yaml(yaml).unwrap_err().to_string();
    assert!(err.contains("poll_initial_interval_secs"));
}

#[test]
fn test_worker_bounds() {
    assert!(Config::from_yaml("max_workers: 0").is_err());
    assert!(Config::from_yaml("max_workers: 17").is_err());
    assert!(Config::from_yaml("max_workers: 16").is_ok());
}

#[test]
fn test_api_base_must_be_http() {
    let err = Config::from_yaml("api_base: ftp://example.com")
        .unwrap_err()
        .to_string();
    assert!(err.contains("api_base"));
}

#[test]
fn test_timeout_for_class() {
    let config = Config::default();
    assert_eq!(
        config.timeout_for(TimeoutClass::Fetch),
        Duration::from_secs(120)
    );
    assert_eq!(
        config.timeout_for(TimeoutClass::Analysis),
        Duration::from_secs(600)
    );
    assert_eq!(
        config.timeout_for(TimeoutClass::Execution),
        Duration::from_secs(1800)
    );
}

#[test]
fn test_timeout_class_from_str() {
    assert_eq!(TimeoutClass::from_str("fetch"), Some(TimeoutClass::Fetch));
    assert_eq!(
        TimeoutClass::from_str("execution"),
        Some(TimeoutClass::Execution)
    );
    assert_eq!(TimeoutClass::from_str("forever"), None);
    assert_eq!(
        RateLimitPolicy::from_str("serialized"),
        Some(RateLimitPolicy::Serialized)
    );
}

#[test]
fn test_round_trip_yaml_keeps_values() {
    let config = Config {
        max_workers: 6,
        rate_limit_policy: RateLimitPolicy::Serialized,
        ..Default::default()
    };
    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();
    assert_eq!(parsed.max_workers, 6);
    assert_eq!(parsed.rate_limit_policy, RateLimitPolicy::Serialized);
}

#[test]
fn test_require_api_key_missing() {
    let config = Config::default();
    let err = config.require_api_key().unwrap_err().to_string();
    assert!(err.contains(API_KEY_ENV));
}

#[test]
#[serial]
fn test_load_or_default_applies_env_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");

    // SAFETY: serialized test; no other thread reads these variables concurrently.
    unsafe {
        std::env::set_var(API_KEY_ENV, "secret-token");
        std::env::set_var(API_BASE_ENV, "http://localhost:9999/v1");
    }

    let config = Config::load_or_default(&path).unwrap();

    unsafe {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(API_BASE_ENV);
    }

    assert_eq!(config.require_api_key().unwrap(), "secret-token");
    assert_eq!(config.api_base, "http://localhost:9999/v1");
}

#[test]
#[serial]
fn test_load_or_default_reads_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    std::fs::write(&path, "api_key: from-file\nmax_workers: 5\n").unwrap();

    unsafe {
        std::env::remove_var(API_KEY_ENV);
    }

    let config = Config::load_or_default(&path).unwrap();
    assert_eq!(config.api_key.as_deref(), Some("from-file"));
    assert_eq!(config.max_workers, 5);
}

#[test]
fn test_load_missing_file_is_user_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(temp_dir.path().join("nope.yaml"))
        .unwrap_err()
        .to_string();
    assert!(err.contains("failed to read config file"));
}
