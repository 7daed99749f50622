//! Node matchers: the query filter of a CSDS request.
//!
//! Mirrors envoy `type.matcher.NodeMatcher`:
//!
//! ```yaml
//! node_id: { exact: fake_node_id }
//! node_metadatas:
//!   - path: [ { key: TRAFFICDIRECTOR_NETWORK_NAME } ]
//!     value: { string_match: { exact: default } }
//! ```
//!
//! The control plane matches these against each client's `Node`. The same
//! evaluation is available locally via [`NodeMatcher::matches`].

use crate::{null_as_default, Node, StringMatcher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filter selecting clients by node id and metadata.
///
/// All present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NodeMatcher {
    /// Match on `Node.id`.
    #[serde(default, alias = "node_id", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<StringMatcher>,

    /// Matches on `Node.metadata`, all ANDed.
    #[serde(
        default,
        alias = "node_metadatas",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub node_metadatas: Vec<StructMatcher>,
}

impl NodeMatcher {
    /// Matcher on node id only.
    #[must_use]
    pub fn with_node_id(node_id: StringMatcher) -> Self {
        Self {
            node_id: Some(node_id),
            node_metadatas: Vec::new(),
        }
    }

    /// Add a metadata matcher (builder pattern).
    #[must_use]
    pub fn with_metadata(mut self, matcher: StructMatcher) -> Self {
        self.node_metadatas.push(matcher);
        self
    }

    /// Check what serde cannot: non-empty paths and compilable regexes.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(node_id) = &self.node_id {
            node_id.validate().map_err(|e| format!("node_id: {e}"))?;
        }
        for (i, m) in self.node_metadatas.iter().enumerate() {
            m.validate()
                .map_err(|e| format!("node_metadatas[{i}]: {e}"))?;
        }
        Ok(())
    }

    /// Evaluate against a node.
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        self.node_id.as_ref().map_or(true, |m| m.matches(&node.id))
            && self
                .node_metadatas
                .iter()
                .all(|m| m.matches(node.metadata.as_ref()))
    }
}

/// A match on the value found at a key path inside a metadata struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructMatcher {
    /// Keys to walk, outermost first. Must not be empty.
    pub path: Vec<PathSegment>,
    /// How to match the value at the end of the path.
    pub value: ValueMatcher,
}

impl StructMatcher {
    /// Create a matcher for the value at `path`.
    pub fn new<I, K>(path: I, value: ValueMatcher) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            path: path.into_iter().map(PathSegment::new).collect(),
            value,
        }
    }

    /// Returns `true` if any path segment names `key`.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.path.iter().any(|p| p.key == key)
    }

    fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("path must have at least one segment".into());
        }
        if self.path.iter().any(|p| p.key.is_empty()) {
            return Err("path segment key must not be empty".into());
        }
        match &self.value {
            ValueMatcher::String(m) => m.validate(),
            _ => Ok(()),
        }
    }

    fn lookup<'a>(&self, metadata: Option<&'a Map<String, Value>>) -> Option<&'a Value> {
        let (first, rest) = self.path.split_first()?;
        let mut value = metadata?.get(&first.key)?;
        for segment in rest {
            value = value.as_object()?.get(&segment.key)?;
        }
        Some(value)
    }

    fn matches(&self, metadata: Option<&Map<String, Value>>) -> bool {
        self.value.matches(self.lookup(metadata))
    }
}

/// One step of a [`StructMatcher`] path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSegment {
    /// Struct field name.
    pub key: String,
}

impl PathSegment {
    /// Create a key segment.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// The envoy `ValueMatcher` oneof, minus `double_match` and `list_match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueMatcherWire", into = "ValueMatcherWire")]
pub enum ValueMatcher {
    /// Value is JSON `null`.
    Null,
    /// Value is a string accepted by the matcher.
    String(StringMatcher),
    /// Value is this boolean.
    Bool(bool),
    /// Value is present (`true`) or absent (`false`).
    Present(bool),
}

impl ValueMatcher {
    /// Evaluate against the value found at the path, if any.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::Present(expected), v) => v.is_some() == *expected,
            (Self::Null, Some(Value::Null)) => true,
            (Self::String(m), Some(Value::String(s))) => m.matches(s),
            (Self::Bool(expected), Some(Value::Bool(b))) => b == expected,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NullMatch {}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct ValueMatcherWire {
    #[serde(default, alias = "null_match", skip_serializing_if = "Option::is_none")]
    null_match: Option<NullMatch>,
    #[serde(default, alias = "string_match", skip_serializing_if = "Option::is_none")]
    string_match: Option<StringMatcher>,
    #[serde(default, alias = "bool_match", skip_serializing_if = "Option::is_none")]
    bool_match: Option<bool>,
    #[serde(default, alias = "present_match", skip_serializing_if = "Option::is_none")]
    present_match: Option<bool>,
}

impl TryFrom<ValueMatcherWire> for ValueMatcher {
    type Error = String;

    fn try_from(wire: ValueMatcherWire) -> Result<Self, Self::Error> {
        let mut arms = [
            wire.null_match.map(|_| Self::Null),
            wire.string_match.map(Self::String),
            wire.bool_match.map(Self::Bool),
            wire.present_match.map(Self::Present),
        ]
        .into_iter()
        .flatten();

        let matcher = arms.next().ok_or(
            "value matcher sets none of null_match, string_match, bool_match, present_match",
        )?;
        if arms.next().is_some() {
            return Err("value matcher sets more than one of null_match, string_match, \
                        bool_match, present_match"
                .into());
        }
        Ok(matcher)
    }
}

impl From<ValueMatcher> for ValueMatcherWire {
    fn from(m: ValueMatcher) -> Self {
        let mut wire = Self::default();
        match m {
            ValueMatcher::Null => wire.null_match = Some(NullMatch {}),
            ValueMatcher::String(s) => wire.string_match = Some(s),
            ValueMatcher::Bool(b) => wire.bool_match = Some(b),
            ValueMatcher::Present(p) => wire.present_match = Some(p),
        }
        wire
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MatcherSpec
// ═══════════════════════════════════════════════════════════════════════════════

/// An ordered list of node matchers parsed from one request source.
///
/// Order matters: [`merge`](crate::merge) pairs matchers by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatcherSpec {
    matchers: Vec<NodeMatcher>,
}

impl MatcherSpec {
    /// Wrap an ordered list of matchers.
    #[must_use]
    pub fn new(matchers: Vec<NodeMatcher>) -> Self {
        Self { matchers }
    }

    /// The matchers, in source order.
    #[must_use]
    pub fn matchers(&self) -> &[NodeMatcher] {
        &self.matchers
    }

    /// Consume into the underlying list.
    #[must_use]
    pub fn into_matchers(self) -> Vec<NodeMatcher> {
        self.matchers
    }

    /// Number of matchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Returns `true` if there are no matchers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Iterate in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeMatcher> {
        self.matchers.iter()
    }
}

impl From<Vec<NodeMatcher>> for MatcherSpec {
    fn from(matchers: Vec<NodeMatcher>) -> Self {
        Self::new(matchers)
    }
}

impl FromIterator<NodeMatcher> for MatcherSpec {
    fn from_iter<I: IntoIterator<Item = NodeMatcher>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MatcherSpec {
    type Item = &'a NodeMatcher;
    type IntoIter = std::slice::Iter<'a, NodeMatcher>;

    fn into_iter(self) -> Self::IntoIter {
        self.matchers.iter()
    }
}

/// First `string_match.exact` among metadata matchers whose path names `key`.
///
/// Returns `None` if no matcher names `key`, or if the first one that does
/// is not an exact string match.
#[must_use]
pub fn metadata_value<'a>(matchers: &'a [NodeMatcher], key: &str) -> Option<&'a str> {
    let found = matchers
        .iter()
        .flat_map(|nm| &nm.node_metadatas)
        .find(|m| m.has_key(key))?;
    match &found.value {
        ValueMatcher::String(s) => s.as_exact(),
        _ => None,
    }
}
