//! Binding to the remote session service.
//!
//! The [`Transport`] trait is the seam between the session lifecycle logic
//! (poller, extractor, cancellation) and the network. [`HttpTransport`] is the
//! production implementation; every call it makes is admitted by the shared
//! [`RateLimiter`](crate::ratelimit::RateLimiter) first.

mod http;
pub mod wire;

pub use http::HttpTransport;

use crate::error::Result;
use crate::session::{Attachment, Session};
use serde::Serialize;

/// Identity of a newly created session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionHandle {
    pub id: String,
    /// Browser URL for watching the session, when the service returns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The four remote operations.
pub trait Transport: Send + Sync {
    /// Start a session for `prompt`, optionally scoped to a repository.
    ///
    /// Fails with `Transport` on a non-2xx reply or a reply without a session id.
    fn create_session(&self, prompt: &str, repository: Option<&str>) -> Result<SessionHandle>;

    /// Fetch the current snapshot of a session.
    fn get_session_state(&self, session_id: &str) -> Result<Session>;

    /// Post a message into a session. `false` means "not delivered".
    fn post_message(&self, session_id: &str, text: &str) -> bool;

    /// Download an attachment's raw bytes. Fails with `NotFound` when the
    /// remote store no longer has it.
    fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>>;
}
