//! JSON shapes exchanged with the remote session API.
//!
//! Responses are parsed leniently: missing or null collections become empty,
//! and attachments may arrive either as bare URLs or as `{uuid|id, name}`
//! objects. Attachment entries of any other shape are dropped one by one so a
//! single odd entry never hides the rest of the snapshot.

use crate::extract::markers::parse_attachment_url;
use crate::session::{Attachment, Message, MessageKind, Session, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostMessageRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    #[serde(default)]
    pub status_enum: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
    #[serde(default)]
    pub structured_output: Option<Value>,
    #[serde(default)]
    pub attachments: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireAttachment {
    Url(String),
    Object {
        #[serde(alias = "uuid")]
        id: String,
        name: String,
    },
}

impl WireAttachment {
    fn from_value(value: &Value) -> Option<Attachment> {
        serde_json::from_value::<WireAttachment>(value.clone())
            .ok()
            .and_then(WireAttachment::into_attachment)
    }

    fn into_attachment(self) -> Option<Attachment> {
        match self {
            WireAttachment::Url(url) => parse_attachment_url(&url),
            WireAttachment::Object { id, name } if !id.is_empty() && !name.is_empty() => {
                Some(Attachment::new(id, name))
            }
            WireAttachment::Object { .. } => None,
        }
    }
}

impl SessionResponse {
    /// Convert to the domain snapshot for session `id`.
    pub fn into_session(self, id: &str) -> Session {
        let status = self
            .status_enum
            .as_deref()
            .map(Status::parse)
            .unwrap_or_else(|| Status::Unknown("unknown".to_string()));

        let mut session = Session::new(id, status);

        session.messages = self
            .messages
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, m)| Message {
                kind: MessageKind::parse(m.kind.as_deref().unwrap_or("unknown")),
                content: m.message.unwrap_or_default(),
                index,
            })
            .collect();

        for attachment in self
            .attachments
            .unwrap_or_default()
            .iter()
            .filter_map(WireAttachment::from_value)
        {
            session.push_attachment(attachment);
        }

        let structured = self.structured_output.filter(|v| !v.is_null());
        if let Some(listed) = structured
            .as_ref()
            .and_then(|v| v.get("attachments"))
            .and_then(Value::as_array)
        {
            for attachment in listed.iter().filter_map(WireAttachment::from_value) {
                session.push_attachment(attachment);
            }
        }
        session.structured_output = structured;

        session
    }
}
