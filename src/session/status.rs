//! Session status vocabulary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Status reported by the remote service for a session.
///
/// `Created` and `Working` are the only known non-terminal values. Unknown
/// strings are kept verbatim and treated as non-terminal so a new server-side
/// state never ends a poll early.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Created,
    Working,
    Blocked,
    Stopped,
    Completed,
    Failed,
    Expired,
    Unknown(String),
}

impl Status {
    /// Parse a wire `status_enum` value.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Status::Created,
            "working" | "running" => Status::Working,
            "blocked" => Status::Blocked,
            "stopped" => Status::Stopped,
            "completed" | "finished" => Status::Completed,
            "failed" => Status::Failed,
            "expired" => Status::Expired,
            other => Status::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Created => "created",
            Status::Working => "working",
            Status::Blocked => "blocked",
            Status::Stopped => "stopped",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::Expired => "expired",
            Status::Unknown(s) => s,
        }
    }

    /// Whether the remote task will not change state any further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Blocked
                | Status::Stopped
                | Status::Completed
                | Status::Failed
                | Status::Expired
        )
    }

    /// Terminal states in which the remote task did not produce its result.
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed | Status::Expired)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Status::parse(&s))
    }
}
