//! `StringMatcher`: the envoy `type.matcher.StringMatcher` value type.
//!
//! Used for the node id of a [`NodeMatcher`](crate::NodeMatcher) and for string
//! values inside metadata matchers. Exactly one pattern is set; the proto
//! `oneof` is enforced by [`MatchPattern`].
//!
//! Deserializes from proto JSON in either field spelling:
//!
//! ```json
//! { "exact": "node-1" }
//! { "safe_regex": { "google_re2": {}, "regex": "^node-\\d+$" }, "ignore_case": false }
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The pattern arm of a [`StringMatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPattern {
    /// Exact string equality.
    Exact(String),
    /// String starts with prefix.
    Prefix(String),
    /// String ends with suffix.
    Suffix(String),
    /// Legacy v2 `regex` field. Must match the whole string.
    Regex(String),
    /// `safe_regex` with the RE2 engine. Must match the whole string.
    SafeRegex(String),
}

impl MatchPattern {
    /// The regex source for the regex arms.
    fn regex_source(&self) -> Option<&str> {
        match self {
            Self::Regex(p) | Self::SafeRegex(p) => Some(p),
            _ => None,
        }
    }
}

/// A string match from a node matcher document.
///
/// # Example
///
/// ```
/// use csds::StringMatcher;
///
/// let m = StringMatcher::prefix("sidecar~").with_ignore_case(true);
/// assert!(m.matches("SIDECAR~10.0.0.1"));
/// assert!(!m.matches("router~10.0.0.1"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StringMatcherWire", into = "StringMatcherWire")]
pub struct StringMatcher {
    pattern: MatchPattern,
    ignore_case: bool,
    /// Compiled form of the regex arms. `None` for the other arms and for
    /// patterns that do not compile, which [`validate`](Self::validate) reports.
    compiled: Option<Regex>,
}

impl PartialEq for StringMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.ignore_case == other.ignore_case
    }
}

impl Eq for StringMatcher {}

impl StringMatcher {
    /// Create a matcher from a pattern, compiling it if it is a regex.
    #[must_use]
    pub fn new(pattern: MatchPattern) -> Self {
        let compiled = pattern
            .regex_source()
            .and_then(|p| compile_anchored(p).ok());
        Self {
            pattern,
            ignore_case: false,
            compiled,
        }
    }

    /// Exact string equality.
    pub fn exact(value: impl Into<String>) -> Self {
        Self::new(MatchPattern::Exact(value.into()))
    }

    /// String starts with `value`.
    pub fn prefix(value: impl Into<String>) -> Self {
        Self::new(MatchPattern::Prefix(value.into()))
    }

    /// String ends with `value`.
    pub fn suffix(value: impl Into<String>) -> Self {
        Self::new(MatchPattern::Suffix(value.into()))
    }

    /// RE2-style regex over the whole string.
    ///
    /// # Errors
    ///
    /// Returns the compile error if `pattern` is not a valid regex.
    pub fn safe_regex(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let compiled = compile_anchored(&pattern)?;
        Ok(Self {
            pattern: MatchPattern::SafeRegex(pattern),
            ignore_case: false,
            compiled: Some(compiled),
        })
    }

    /// Set case-insensitive matching for exact/prefix/suffix.
    #[must_use]
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Returns the pattern arm.
    #[must_use]
    pub fn pattern(&self) -> &MatchPattern {
        &self.pattern
    }

    /// Returns whether exact/prefix/suffix ignore ASCII case.
    #[must_use]
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Returns the exact value, if this is an exact matcher.
    #[must_use]
    pub fn as_exact(&self) -> Option<&str> {
        match &self.pattern {
            MatchPattern::Exact(v) => Some(v),
            _ => None,
        }
    }

    /// Check that regex patterns compile.
    ///
    /// # Errors
    ///
    /// Returns a description of the bad pattern.
    pub fn validate(&self) -> Result<(), String> {
        match (self.pattern.regex_source(), &self.compiled) {
            (Some(p), None) => compile_anchored(p)
                .map(|_| ())
                .map_err(|e| format!("invalid regex \"{p}\": {e}")),
            _ => Ok(()),
        }
    }

    /// Evaluate this matcher against `value`.
    ///
    /// An invalid regex never matches.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        let fold = |s: &str| {
            if self.ignore_case {
                s.to_ascii_lowercase()
            } else {
                s.to_owned()
            }
        };
        match &self.pattern {
            MatchPattern::Exact(v) => fold(value) == fold(v),
            MatchPattern::Prefix(v) => fold(value).starts_with(&fold(v)),
            MatchPattern::Suffix(v) => fold(value).ends_with(&fold(v)),
            MatchPattern::Regex(_) | MatchPattern::SafeRegex(_) => {
                self.compiled.as_ref().is_some_and(|re| re.is_match(value))
            }
        }
    }
}

impl fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            MatchPattern::Exact(v) => write!(f, "Exact(\"{v}\")"),
            MatchPattern::Prefix(v) => write!(f, "Prefix(\"{v}\")"),
            MatchPattern::Suffix(v) => write!(f, "Suffix(\"{v}\")"),
            MatchPattern::Regex(v) => write!(f, "Regex(\"{v}\")"),
            MatchPattern::SafeRegex(v) => write!(f, "SafeRegex(\"{v}\")"),
        }?;
        if self.ignore_case {
            write!(f, " ignore_case")?;
        }
        Ok(())
    }
}

/// Envoy regex matchers are full-string matches.
fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Proto JSON shape
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct StringMatcherWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<String>,
    #[serde(default, alias = "safe_regex", skip_serializing_if = "Option::is_none")]
    safe_regex: Option<RegexMatcherWire>,
    #[serde(default, alias = "ignore_case", skip_serializing_if = "std::ops::Not::not")]
    ignore_case: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RegexMatcherWire {
    /// Engine selector; RE2 is the only engine, so its settings are accepted and dropped.
    #[serde(default, alias = "google_re2", skip_serializing)]
    google_re2: Option<serde_json::Value>,
    regex: String,
}

impl TryFrom<StringMatcherWire> for StringMatcher {
    type Error = String;

    fn try_from(wire: StringMatcherWire) -> Result<Self, Self::Error> {
        let mut patterns = [
            wire.exact.map(MatchPattern::Exact),
            wire.prefix.map(MatchPattern::Prefix),
            wire.suffix.map(MatchPattern::Suffix),
            wire.regex.map(MatchPattern::Regex),
            wire.safe_regex.map(|r| MatchPattern::SafeRegex(r.regex)),
        ]
        .into_iter()
        .flatten();

        let pattern = patterns
            .next()
            .ok_or("string matcher sets none of exact, prefix, suffix, regex, safe_regex")?;
        if patterns.next().is_some() {
            return Err(
                "string matcher sets more than one of exact, prefix, suffix, regex, safe_regex"
                    .into(),
            );
        }

        Ok(Self::new(pattern).with_ignore_case(wire.ignore_case))
    }
}

impl From<StringMatcher> for StringMatcherWire {
    fn from(m: StringMatcher) -> Self {
        let mut wire = Self {
            ignore_case: m.ignore_case,
            ..Self::default()
        };
        match m.pattern {
            MatchPattern::Exact(v) => wire.exact = Some(v),
            MatchPattern::Prefix(v) => wire.prefix = Some(v),
            MatchPattern::Suffix(v) => wire.suffix = Some(v),
            MatchPattern::Regex(v) => wire.regex = Some(v),
            MatchPattern::SafeRegex(regex) => {
                wire.safe_regex = Some(RegexMatcherWire {
                    google_re2: None,
                    regex,
                });
            }
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_matches() {
        let m = StringMatcher::exact("node-1");
        assert!(m.matches("node-1"));
        assert!(!m.matches("Node-1"));
        assert!(!m.matches("node-10"));
    }

    #[test]
    fn ignore_case_folds_ascii() {
        let m = StringMatcher::exact("node-1").with_ignore_case(true);
        assert!(m.matches("NODE-1"));

        let m = StringMatcher::suffix(".internal").with_ignore_case(true);
        assert!(m.matches("proxy.INTERNAL"));
    }

    #[test]
    fn safe_regex_matches_whole_string() {
        let m = StringMatcher::safe_regex(r"node-\d+").unwrap();
        assert!(m.matches("node-42"));
        assert!(!m.matches("my-node-42"));
    }

    #[test]
    fn regex_is_compiled_when_built() {
        let m: StringMatcher =
            serde_json::from_value(json!({ "safe_regex": { "regex": "node-\\d+" } })).unwrap();
        assert!(m.compiled.is_some());
        assert!(m.clone().with_ignore_case(true).matches("node-7"));

        let legacy = StringMatcher::new(MatchPattern::Regex("a|b".into()));
        assert!(legacy.compiled.is_some());
        assert!(legacy.matches("b"));
        assert!(!legacy.matches("ab"));

        assert!(StringMatcher::exact("a").compiled.is_none());
    }

    #[test]
    fn equality_ignores_compiled_form() {
        let built = StringMatcher::safe_regex("a.*").unwrap();
        let parsed: StringMatcher =
            serde_json::from_value(json!({ "safeRegex": { "regex": "a.*" } })).unwrap();
        assert_eq!(built, parsed);
        assert_ne!(built, StringMatcher::safe_regex("b.*").unwrap());
    }

    #[test]
    fn invalid_regex_rejected_at_construction() {
        assert!(StringMatcher::safe_regex("[bad").is_err());
    }

    #[test]
    fn deserialize_snake_and_camel_case() {
        let snake: StringMatcher = serde_json::from_value(json!({
            "safe_regex": { "google_re2": {}, "regex": "^a$" },
            "ignore_case": true
        }))
        .unwrap();
        let camel: StringMatcher = serde_json::from_value(json!({
            "safeRegex": { "googleRe2": {}, "regex": "^a$" },
            "ignoreCase": true
        }))
        .unwrap();
        assert_eq!(snake, camel);
        assert_eq!(snake.pattern(), &MatchPattern::SafeRegex("^a$".into()));
        assert!(snake.ignore_case());
    }

    #[test]
    fn deserialize_rejects_empty_and_ambiguous() {
        let err = serde_json::from_value::<StringMatcher>(json!({})).unwrap_err();
        assert!(err.to_string().contains("sets none"));

        let err = serde_json::from_value::<StringMatcher>(json!({ "exact": "a", "prefix": "b" }))
            .unwrap_err();
        assert!(err.to_string().contains("more than one"));

        assert!(serde_json::from_value::<StringMatcher>(json!({ "contains": "a" })).is_err());
    }

    #[test]
    fn serializes_as_proto_json() {
        let m = StringMatcher::exact("fake_node_id");
        assert_eq!(serde_json::to_value(&m).unwrap(), json!({ "exact": "fake_node_id" }));

        let m = StringMatcher::safe_regex("a.*").unwrap().with_ignore_case(true);
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            json!({ "safeRegex": { "regex": "a.*" }, "ignoreCase": true })
        );
    }

    #[test]
    fn validate_reports_bad_legacy_regex() {
        let m: StringMatcher = serde_json::from_value(json!({ "regex": "(" })).unwrap();
        assert!(m.validate().unwrap_err().contains("invalid regex"));
        assert!(!m.matches("("));
        assert!(StringMatcher::prefix("x").validate().is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(StringMatcher::exact("a").to_string(), r#"Exact("a")"#);
        assert_eq!(
            StringMatcher::prefix("b").with_ignore_case(true).to_string(),
            r#"Prefix("b") ignore_case"#
        );
    }
}
