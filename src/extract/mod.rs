//! Locating a session's JSON artifact.
//!
//! Strategies are tried in a fixed order and the first tier that yields
//! anything wins:
//!
//! 1. **Structured field**: the snapshot's `structured_output`, optionally
//!    narrowed to one sub-key.
//! 2. **Attachment list**: attachments listed by the service, in server order,
//!    whose name starts with the filter and ends in `.json`. Each is fetched
//!    and parsed; a candidate that fails to download or parse is skipped.
//! 3. **Embedded markers**: `ATTACHMENT:"<url>"` tokens in agent messages,
//!    most recent message first, fetched like tier 2. Ids already tried in
//!    tier 2 are not fetched again.
//! 4. **Free text**: the outermost `{...}` span of the most recent agent
//!    message, parsed without any network call.
//!
//! In [`ExtractMode::All`] tiers 2 and 3 keep every match instead of stopping
//! at the first.

pub mod links;
pub mod markers;

use crate::error::{RelayError, Result};
use crate::session::{Attachment, Session};
use crate::transport::Transport;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Stop at the first match.
    #[default]
    First,
    /// Keep every match found at the winning tier.
    All,
}

/// What to look for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Attachment name prefix, e.g. `plan` matches `plan_1.json`.
    pub name_filter: Option<String>,
    /// Sub-key of `structured_output` (and of attachment documents) to return.
    pub field: Option<String>,
    pub mode: ExtractMode,
}

impl ExtractRequest {
    pub fn named(filter: impl Into<String>) -> Self {
        Self {
            name_filter: Some(filter.into()),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn collect_all(mut self) -> Self {
        self.mode = ExtractMode::All;
        self
    }

    fn accepts(&self, attachment: &Attachment) -> bool {
        attachment.is_json()
            && self
                .name_filter
                .as_deref()
                .is_none_or(|prefix| attachment.name.starts_with(prefix))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentHit {
    pub attachment: Attachment,
    pub document: Value,
}

/// Result of running the strategy chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Structured(Value),
    Attachments(Vec<AttachmentHit>),
    Text(Value),
    NotFound,
}

impl Extraction {
    /// Name of the tier that produced the result.
    pub fn tier(&self) -> &'static str {
        match self {
            Extraction::Structured(_) => "structured",
            Extraction::Attachments(_) => "attachment",
            Extraction::Text(_) => "text",
            Extraction::NotFound => "none",
        }
    }

    /// Collapse to one JSON document: the match itself in `First` mode, an
    /// array of every match in `All` mode.
    pub fn into_document(self, mode: ExtractMode) -> Option<Value> {
        let mut docs = match self {
            Extraction::Structured(v) | Extraction::Text(v) => vec![v],
            Extraction::Attachments(hits) => hits.into_iter().map(|h| h.document).collect(),
            Extraction::NotFound => return None,
        };
        match mode {
            ExtractMode::All => Some(Value::Array(docs)),
            ExtractMode::First if docs.is_empty() => None,
            ExtractMode::First => Some(docs.swap_remove(0)),
        }
    }
}

pub struct ArtifactExtractor<'a> {
    transport: &'a dyn Transport,
}

impl<'a> ArtifactExtractor<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Run the strategy chain and return the parsed document.
    ///
    /// Fails with `NotFound` when no tier yields a match.
    pub fn extract(&self, session: &Session, request: &ExtractRequest) -> Result<Value> {
        let extraction = self.locate(session, request);
        debug!(session_id = %session.id, tier = extraction.tier(), "extraction finished");
        extraction.into_document(request.mode).ok_or_else(|| {
            RelayError::NotFound(format!(
                "no artifact{} found in session {}",
                request
                    .name_filter
                    .as_deref()
                    .map(|f| format!(" matching '{}'", f))
                    .unwrap_or_default(),
                session.id
            ))
        })
    }

    /// Run the strategy chain, reporting which tier matched.
    pub fn locate(&self, session: &Session, request: &ExtractRequest) -> Extraction {
        if let Some(value) = structured_field(session, request.field.as_deref()) {
            return Extraction::Structured(value);
        }

        let mut tried = HashSet::new();

        let hits = self.scan(session.attachments.iter().cloned(), request, &mut tried);
        if !hits.is_empty() {
            return Extraction::Attachments(hits);
        }

        let referenced = session
            .agent_messages_newest_first()
            .flat_map(|m| markers::parse_markers(&m.content));
        let hits = self.scan(referenced, request, &mut tried);
        if !hits.is_empty() {
            return Extraction::Attachments(hits);
        }

        if let Some(value) = session
            .latest_agent_message()
            .and_then(|m| json_in_text(&m.content))
        {
            return Extraction::Text(drill(value, request.field.as_deref()));
        }

        Extraction::NotFound
    }

    fn scan(
        &self,
        candidates: impl Iterator<Item = Attachment>,
        request: &ExtractRequest,
        tried: &mut HashSet<String>,
    ) -> Vec<AttachmentHit> {
        let mut hits = Vec::new();
        for attachment in candidates {
            if !request.accepts(&attachment) || !tried.insert(attachment.id.clone()) {
                continue;
            }
            match self.fetch_json(&attachment) {
                Ok(document) => {
                    hits.push(AttachmentHit {
                        document: drill(document, request.field.as_deref()),
                        attachment,
                    });
                    if request.mode == ExtractMode::First {
                        break;
                    }
                }
                Err(e) => {
                    warn!(attachment = %attachment.name, error = %e, "skipping attachment");
                }
            }
        }
        hits
    }

    fn fetch_json(&self, attachment: &Attachment) -> Result<Value> {
        let bytes = self.transport.fetch_attachment(attachment)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            RelayError::Transport(format!("attachment '{}' is not UTF-8: {}", attachment.name, e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            RelayError::Transport(format!(
                "attachment '{}' is not valid JSON: {}",
                attachment.name, e
            ))
        })
    }
}

/// Tier 1. With a field, only that sub-key counts; without one, an object
/// whose only key is `attachments` carries no result of its own.
fn structured_field(session: &Session, field: Option<&str>) -> Option<Value> {
    let output = session.structured_output.as_ref()?;
    match field {
        Some(key) => output.get(key).filter(|v| !v.is_null()).cloned(),
        None => match output {
            Value::Null => None,
            Value::Object(map) if map.keys().all(|k| k == "attachments") => None,
            other => Some(other.clone()),
        },
    }
}

/// Narrow a document to `field` when it is an object carrying that key.
fn drill(document: Value, field: Option<&str>) -> Value {
    match (field, document) {
        (Some(key), Value::Object(mut map)) if map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        (_, document) => document,
    }
}

/// Parse the span from the first `{` to the last `}` of `text`.
pub fn json_in_text(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
