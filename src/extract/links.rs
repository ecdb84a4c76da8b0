//! Pull-request links announced in agent messages.

use crate::session::Session;
use regex::Regex;
use std::sync::LazyLock;

static PULL_REQUEST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+/pull/\d+")
        .expect("pull request pattern is valid")
});

/// The first pull-request URL in the most recent agent message that has one.
pub fn find_pull_request_url(session: &Session) -> Option<String> {
    session
        .agent_messages_newest_first()
        .find_map(|m| PULL_REQUEST_URL.find(&m.content))
        .map(|m| m.as_str().to_string())
}

pub fn has_pull_request_url(session: &Session) -> bool {
    find_pull_request_url(session).is_some()
}
