//! Prompt templates.
//!
//! Prompts are plain text with `{name}` placeholders. Because prompts often
//! describe the JSON shape the agent should produce, literal braces are
//! written doubled: `{{` renders `{` and `}}` renders `}`. A single `}` with
//! no opening brace is kept as is.
//!
//! Rendering is strict: an undefined name is an error rather than an empty
//! substitution.

use crate::error::RelayError;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("undefined variable '{name}' at position {position} in prompt template")]
    UndefinedVariable { name: String, position: usize },

    #[error("unmatched '{{' at position {position} in prompt template")]
    UnmatchedBrace { position: usize },

    #[error("empty variable name '{{}}' at position {position} in prompt template")]
    EmptyVariableName { position: usize },
}

impl From<TemplateError> for RelayError {
    fn from(e: TemplateError) -> Self {
        RelayError::UserError(e.to_string())
    }
}

/// Substitute every `{name}` in `template` from `variables`.
pub fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(i) = rest.find(['{', '}']) {
        out.push_str(&rest[..i]);
        let position = offset + i;
        let tail = &rest[i..];

        let consumed = if tail.starts_with("{{") {
            out.push('{');
            2
        } else if tail.starts_with("}}") {
            out.push('}');
            2
        } else if tail.starts_with('}') {
            out.push('}');
            1
        } else {
            let close = tail
                .find('}')
                .ok_or(TemplateError::UnmatchedBrace { position })?;
            let name = tail[1..close].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyVariableName { position });
            }
            let value = variables
                .get(name)
                .ok_or_else(|| TemplateError::UndefinedVariable {
                    name: name.to_string(),
                    position,
                })?;
            out.push_str(value);
            close + 1
        };

        rest = &tail[consumed..];
        offset = position + consumed;
    }

    out.push_str(rest);
    Ok(out)
}

/// Build a variables map from key/value pairs.
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Parse a `key=value` assignment as given to `--var`.
pub fn parse_assignment(s: &str) -> Result<(String, String), RelayError> {
    let (key, value) = s.split_once('=').ok_or_else(|| {
        RelayError::UserError(format!("invalid variable '{}': expected key=value", s))
    })?;
    let key = key.trim();
    if key.is_empty() || key.contains(['{', '}']) {
        return Err(RelayError::UserError(format!(
            "invalid variable name in '{}'",
            s
        )));
    }
    Ok((key.to_string(), value.to_string()))
}
