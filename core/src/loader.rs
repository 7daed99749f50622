//! Loading node matchers from a request file or inline request text.
//!
//! Both sources hold the same document:
//!
//! ```yaml
//! node_matchers:
//!   - node_id: { exact: fake_node_id }
//!     node_metadatas:
//!       - path: [ { key: TRAFFICDIRECTOR_NETWORK_NAME } ]
//!         value: { string_match: { exact: fake_network_name } }
//! ```
//!
//! Files are always read as YAML (JSON is a subset). Inline text is parsed as
//! JSON when it tokenizes as JSON, and converted from YAML otherwise.
//! Loading is all-or-nothing: one malformed matcher fails the whole source.

use crate::{Error, MatcherSpec, NodeMatcher, Result};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Top-level document key holding the matcher list.
const NODE_MATCHERS_KEY: &str = "node_matchers";

/// Load node matchers from a YAML or JSON file.
///
/// An empty path or an empty file yields an empty [`MatcherSpec`].
///
/// # Errors
///
/// - [`Error::Read`] if the file cannot be read
/// - [`Error::InvalidDocument`] if the document is malformed
/// - [`Error::InvalidMatcher`] if any matcher is malformed
pub fn load_from_file(path: impl AsRef<Path>) -> Result<MatcherSpec> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Ok(MatcherSpec::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(MatcherSpec::default());
    }

    let document: Value = serde_yaml::from_str(&content).map_err(|e| Error::InvalidDocument {
        reason: format!("YAML parse error in \"{}\": {e}", path.display()),
    })?;
    let spec = parse_document(document)?;
    debug!(path = %path.display(), count = spec.len(), "loaded node matchers from file");
    Ok(spec)
}

/// Load node matchers from inline JSON or YAML text.
///
/// Empty or whitespace-only text yields an empty [`MatcherSpec`].
///
/// # Errors
///
/// - [`Error::InvalidDocument`] if the document is malformed
/// - [`Error::InvalidMatcher`] if any matcher is malformed
pub fn load_from_text(text: &str) -> Result<MatcherSpec> {
    if text.trim().is_empty() {
        return Ok(MatcherSpec::default());
    }

    let document: Value = if is_json(text) {
        serde_json::from_str(text).map_err(|e| Error::InvalidDocument {
            reason: format!("JSON parse error: {e}"),
        })?
    } else {
        serde_yaml::from_str(text).map_err(|e| Error::InvalidDocument {
            reason: format!("YAML parse error: {e}"),
        })?
    };
    let spec = parse_document(document)?;
    debug!(count = spec.len(), "loaded node matchers from text");
    Ok(spec)
}

/// Returns `true` if `text` tokenizes as a stream of JSON values.
///
/// Used to tell strict JSON from relaxed YAML; it does not check that the
/// stream holds exactly one document.
#[must_use]
pub fn is_json(text: &str) -> bool {
    serde_json::Deserializer::from_str(text)
        .into_iter::<serde::de::IgnoredAny>()
        .all(|token| token.is_ok())
}

fn parse_document(document: Value) -> Result<MatcherSpec> {
    let mut root = match document {
        Value::Null => return Ok(MatcherSpec::default()),
        Value::Object(root) => root,
        other => {
            return Err(Error::InvalidDocument {
                reason: format!("expected a mapping at the top level, found {}", kind(&other)),
            })
        }
    };

    let entries = match root.remove(NODE_MATCHERS_KEY) {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) => return Ok(MatcherSpec::default()),
        Some(other) => {
            return Err(Error::InvalidDocument {
                reason: format!("`{NODE_MATCHERS_KEY}` must be a sequence, found {}", kind(&other)),
            })
        }
        None => {
            return Err(Error::InvalidDocument {
                reason: format!("missing `{NODE_MATCHERS_KEY}`"),
            })
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_matcher(index, entry))
        .collect()
}

fn parse_matcher(index: usize, entry: Value) -> Result<NodeMatcher> {
    let matcher: NodeMatcher =
        serde_json::from_value(entry).map_err(|e| Error::InvalidMatcher {
            index,
            reason: e.to_string(),
        })?;
    matcher
        .validate()
        .map_err(|reason| Error::InvalidMatcher { index, reason })?;
    Ok(matcher)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
