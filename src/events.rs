//! Append-only audit log of session lifecycle events.
//!
//! Events are stored as NDJSON (one JSON object per line) in
//! `{state_dir}/events/events.ndjson`.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`session_create`, `cache_hit`, ...)
//! - `actor`: the local user, `user@HOST`
//! - `session`: remote session id, when one exists
//! - `details`: freeform object with action-specific fields
//!
//! The log is advisory. [`EventLog::record`] never fails the caller; write
//! errors are reported through `tracing` and otherwise ignored.

use crate::context::RelayContext;
use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A remote session was created.
    SessionCreate,
    /// A session reached a terminal state (or was stopped early).
    SessionFinish,
    /// Polling ran past its deadline.
    PollTimeout,
    /// Polling gave up after consecutive transport failures.
    PollUnreachable,
    Cancel,
    /// A request was answered from the cache.
    CacheHit,
    /// An extracted artifact was written to the cache.
    ArtifactStore,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventAction::SessionCreate => "session_create",
            EventAction::SessionFinish => "session_finish",
            EventAction::PollTimeout => "poll_timeout",
            EventAction::PollUnreachable => "poll_unreachable",
            EventAction::Cancel => "cancel",
            EventAction::CacheHit => "cache_hit",
            EventAction::ArtifactStore => "artifact_store",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,
    pub action: EventAction,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub details: Value,
}

impl Event {
    /// New event stamped with the current time and local actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            session: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session = Some(session_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize to a single JSON line without the trailing newline.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RelayError::UserError(format!("failed to serialize event: {}", e)))
    }
}

fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Handle on the events file.
#[derive(Debug, Clone)]
pub struct EventLog {
    file: PathBuf,
}

impl EventLog {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn for_context(ctx: &RelayContext) -> Self {
        Self::new(ctx.events_file())
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Append one event, creating the file and its directory if needed.
    pub fn append(&self, event: &Event) -> Result<()> {
        let line = event.to_ndjson_line()?;

        if let Some(dir) = self.file.parent()
            && !dir.exists()
        {
            fs::create_dir_all(dir).map_err(|e| {
                RelayError::UserError(format!(
                    "failed to create events directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .map_err(|e| {
                RelayError::UserError(format!(
                    "failed to open events file '{}': {}",
                    self.file.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", line).map_err(|e| {
            RelayError::UserError(format!(
                "failed to write event to '{}': {}",
                self.file.display(),
                e
            ))
        })
    }

    /// Append an event, downgrading failures to a warning.
    pub fn record(&self, event: Event) {
        if let Err(e) = self.append(&event) {
            warn!(action = %event.action, error = %e, "event not recorded");
        }
    }

    /// Read back every event in the file. Lines that fail to parse are skipped.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.file).map_err(|e| {
            RelayError::UserError(format!(
                "failed to read events file '{}': {}",
                self.file.display(),
                e
            ))
        })?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir) -> EventLog {
        EventLog::for_context(&RelayContext::at(dir.path()))
    }

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::SessionCreate);

        assert_eq!(event.action, EventAction::SessionCreate);
        assert!(event.actor.contains('@'));
        assert!(event.session.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_serialization_is_single_line_snake_case() {
        let event = Event::new(EventAction::PollUnreachable)
            .with_session("devin-abc")
            .with_details(json!({"consecutive_failures": 3}));

        let line = event.to_ndjson_line().unwrap();

        assert!(!line.contains('\n'));
        assert!(line.contains("\"poll_unreachable\""));
        let parsed: Event = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.session.as_deref(), Some("devin-abc"));
        assert_eq!(parsed.details["consecutive_failures"], 3);
    }

    #[test]
    fn test_session_field_omitted_when_absent() {
        let line = Event::new(EventAction::CacheHit).to_ndjson_line().unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert!(parsed.get("session").is_none());
    }

    #[test]
    fn test_append_creates_directory_and_appends_lines() {
        let temp = TempDir::new().unwrap();
        let log = log_in(&temp);
        assert!(!log.path().exists());

        log.append(&Event::new(EventAction::SessionCreate).with_session("s1"))
            .unwrap();
        log.append(&Event::new(EventAction::SessionFinish).with_session("s1"))
            .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.ends_with('\n'));
        assert_eq!(content.lines().count(), 2);

        let events = log.read_all().unwrap();
        assert_eq!(events[0].action, EventAction::SessionCreate);
        assert_eq!(events[1].action, EventAction::SessionFinish);
    }

    #[test]
    fn test_record_swallows_write_errors() {
        let temp = TempDir::new().unwrap();
        // A directory where the file should be makes the open fail.
        let blocked = temp.path().join("events.ndjson");
        fs::create_dir_all(&blocked).unwrap();

        let log = EventLog::new(&blocked);
        assert!(log.append(&Event::new(EventAction::Cancel)).is_err());
        log.record(Event::new(EventAction::Cancel));
    }

    #[test]
    fn test_read_all_on_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(log_in(&temp).read_all().unwrap().is_empty());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(EventAction::SessionCreate.to_string(), "session_create");
        assert_eq!(EventAction::ArtifactStore.to_string(), "artifact_store");
        assert_eq!(EventAction::PollTimeout.to_string(), "poll_timeout");
    }
}
