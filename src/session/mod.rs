//! Observed state of a remote agent session.
//!
//! A [`Session`] is a snapshot: the remote service owns the real lifecycle and
//! relay never writes to it, except that a poller keeps the message sequence
//! growing monotonically across snapshots (see [`Session::merge_transcript`]).

mod status;

pub use status::Status;

use serde::Serialize;
use serde_json::Value;

/// Who authored a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Written by the remote agent (`devin_message`).
    Agent,
    /// Written by the caller (`user_message`).
    User,
    /// Written by the service itself (`system_message`).
    System,
    Other(String),
}

impl MessageKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "devin_message" | "agent_message" => MessageKind::Agent,
            "user_message" => MessageKind::User,
            "system_message" => MessageKind::System,
            other => MessageKind::Other(other.to_string()),
        }
    }

    /// Short label used when printing a live transcript.
    pub fn label(&self) -> &str {
        match self {
            MessageKind::Agent => "agent",
            MessageKind::User => "user",
            MessageKind::System => "system",
            MessageKind::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    pub content: String,
    /// Position in the session's message sequence.
    pub index: usize,
}

impl Message {
    pub fn is_agent(&self) -> bool {
        self.kind == MessageKind::Agent
    }
}

/// A separately downloadable file produced by a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Attachment {
    /// De-duplication key.
    pub id: String,
    pub name: String,
}

impl Attachment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with(".json")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: String,
    pub status: Status,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<Value>,
    /// Attachments listed by the service, de-duplicated by id in server order.
    pub attachments: Vec<Attachment>,
}

impl Session {
    pub fn new(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            status,
            messages: Vec::new(),
            structured_output: None,
            attachments: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Agent-authored messages, most recent first.
    pub fn agent_messages_newest_first(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev().filter(|m| m.is_agent())
    }

    pub fn latest_agent_message(&self) -> Option<&Message> {
        self.agent_messages_newest_first().next()
    }

    /// Append an attachment unless one with the same id is already present.
    pub fn push_attachment(&mut self, attachment: Attachment) -> bool {
        if self.attachments.iter().any(|a| a.id == attachment.id) {
            return false;
        }
        self.attachments.push(attachment);
        true
    }

    /// Keep the locally observed transcript when this snapshot carries fewer
    /// messages than were already seen.
    pub fn merge_transcript(&mut self, observed: &[Message]) {
        if observed.len() > self.messages.len() {
            self.messages = observed.to_vec();
        }
    }
}
