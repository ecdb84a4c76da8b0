//! Cache key construction and subject normalization.

use crate::error::{RelayError, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("category pattern is valid"));

/// Hosts recognized as a leading segment even without a `scheme://`.
const KNOWN_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("scheme pattern is valid"));

/// Identity of a cached artifact: `{category}_{subject}[_{sub_id}]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    category: String,
    subject: String,
    sub_id: Option<String>,
}

impl CacheKey {
    /// Build a key, normalizing `subject` and validating the parts.
    pub fn new(category: &str, subject: &str, sub_id: Option<&str>) -> Result<Self> {
        if !CATEGORY.is_match(category) {
            return Err(RelayError::UserError(format!(
                "invalid cache category '{}': use letters, digits, '_' or '-'",
                category
            )));
        }

        let normalized = normalize_subject(subject);
        if normalized.is_empty() {
            return Err(RelayError::UserError(format!(
                "cache subject '{}' is empty after normalization",
                subject
            )));
        }

        let sub_id = match sub_id.map(str::trim) {
            None | Some("") => None,
            Some(id) => {
                let id = sanitize(id);
                if id.contains("..") {
                    return Err(RelayError::UserError(format!("invalid cache sub-id '{}'", id)));
                }
                Some(id)
            }
        };

        Ok(Self {
            category: category.to_string(),
            subject: normalized,
            sub_id,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sub_id(&self) -> Option<&str> {
        self.sub_id.as_deref()
    }

    /// File name of the cached document.
    pub fn file_name(&self) -> String {
        format!("{}.json", self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.category, self.subject)?;
        if let Some(sub_id) = &self.sub_id {
            write!(f, "_{}", sub_id)?;
        }
        Ok(())
    }
}

/// Reduce a repository URL or path to a file-name-safe identifier.
///
/// `https://github.com/acme/widgets.git` and `acme/widgets` both become
/// `acme_widgets`. The leading segment is dropped as a host only after a
/// `scheme://` or when it is a known forge host, so `socket.io/client` keeps
/// its owner.
pub fn normalize_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    let had_scheme = SCHEME.is_match(trimmed);
    let mut s = SCHEME.replace(trimmed, "").into_owned();

    if let Some((head, rest)) = s.split_once('/')
        && (had_scheme || KNOWN_HOSTS.contains(&head.to_ascii_lowercase().as_str()))
    {
        s = rest.to_string();
    }

    let mut s = s.as_str();
    loop {
        let before = s.len();
        s = s.trim_end_matches('/');
        s = s.strip_suffix(".git").unwrap_or(s);
        if s.len() == before {
            break;
        }
    }

    sanitize(s.trim_start_matches('/'))
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
