//! Parser for attachment markers embedded in agent message text.
//!
//! # Grammar
//!
//! ```text
//! marker     = 'ATTACHMENT:"' url '"'
//! url        = any characters except '"', ending in path-tail
//! path-tail  = '/attachments/' id '/' name
//! id, name   = one or more characters except '/' and '"'
//! ```
//!
//! One marker yields at most one [`Attachment`]. Markers whose url does not end
//! in the attachments path shape are ignored. A message may contain any number
//! of markers; they are returned in textual order.

use crate::session::Attachment;
use regex::Regex;
use std::sync::LazyLock;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ATTACHMENT:"([^"]+)""#).expect("marker pattern is valid")
});

static ATTACHMENT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/attachments/([^/]+)/([^/]+)$").expect("attachment url pattern is valid")
});

/// Resolve an attachment url to its id and file name.
///
/// Returns `None` unless the url ends in `/attachments/{id}/{name}`.
pub fn parse_attachment_url(url: &str) -> Option<Attachment> {
    let caps = ATTACHMENT_URL.captures(url.trim())?;
    let id = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str();
    Some(Attachment::new(id, name))
}

/// The attachment behind every well-formed marker in `text`, in order of
/// appearance.
pub fn parse_markers(text: &str) -> Vec<Attachment> {
    if !text.contains("ATTACHMENT:") {
        return Vec::new();
    }
    MARKER
        .captures_iter(text)
        .filter_map(|caps| parse_attachment_url(caps.get(1)?.as_str()))
        .collect()
}
