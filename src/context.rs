//! State directory resolution.
//!
//! Every command works against one state directory holding the config file,
//! the artifact cache and the event log:
//!
//! ```text
//! {state_dir}/
//!   config.yaml
//!   cache/{key}.json
//!   events/events.ndjson
//! ```
//!
//! The directory comes from `--state-dir`, then `RELAY_HOME`, then `./.relay`.

use crate::config::Config;
use crate::error::{RelayError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the state directory.
pub const STATE_DIR_ENV: &str = "RELAY_HOME";

/// State directory used when neither the flag nor the env var is set,
/// relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".relay";

/// Resolved absolute paths under the state directory.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub state_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub events_dir: PathBuf,
    pub config_path: PathBuf,
}

impl RelayContext {
    /// Resolve the state directory from the flag, the environment, or the default.
    pub fn resolve(flag: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            RelayError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        let from_env = env::var_os(STATE_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Ok(Self::resolve_from(&cwd, flag, from_env.as_deref()))
    }

    /// Resolution against an explicit working directory.
    pub fn resolve_from(cwd: &Path, flag: Option<&Path>, from_env: Option<&Path>) -> Self {
        let chosen = flag
            .or(from_env)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
        let state_dir = if chosen.is_absolute() {
            chosen
        } else {
            cwd.join(chosen)
        };
        Self::at(state_dir)
    }

    /// Context rooted at `state_dir`.
    pub fn at(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            cache_dir: state_dir.join("cache"),
            events_dir: state_dir.join("events"),
            config_path: state_dir.join("config.yaml"),
            state_dir,
        }
    }

    pub fn events_file(&self) -> PathBuf {
        self.events_dir.join("events.ndjson")
    }

    /// Load `config.yaml`, falling back to defaults when it does not exist.
    pub fn load_config(&self) -> Result<Config> {
        Config::load_or_default(&self.config_path)
    }
}
