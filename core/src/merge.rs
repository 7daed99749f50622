//! Positional merge of two node matcher lists.
//!
//! The request file is the base and the inline text is the overlay. Matchers
//! pair up by index, not by any key: `overlay[i]` merges into `base[i]`, and
//! overlay matchers past the end of `base` are appended. Field merging follows
//! proto merge rules:
//!
//! | Field | Rule |
//! |-------|------|
//! | `node_id` | overlay pattern replaces base; `ignore_case` is ORed |
//! | `node_metadatas` | base entries, then overlay entries, no dedup |
//! | unset in overlay | base kept |

use crate::{load_from_file, load_from_text, MatcherSpec, NodeMatcher, Result, StringMatcher};
use std::path::Path;
use tracing::debug;

/// Merge `overlay` into a copy of `base` by position.
///
/// Neither input is modified. The result is never shorter than `base`.
///
/// # Example
///
/// ```
/// use csds::{merge, MatcherSpec, NodeMatcher, StringMatcher};
///
/// let base = MatcherSpec::new(vec![NodeMatcher::with_node_id(StringMatcher::exact("a"))]);
/// let overlay = MatcherSpec::new(vec![
///     NodeMatcher::with_node_id(StringMatcher::exact("b")),
///     NodeMatcher::with_node_id(StringMatcher::exact("c")),
/// ]);
///
/// let merged = merge(&base, &overlay);
/// assert_eq!(merged, overlay);
/// ```
#[must_use]
pub fn merge(base: &MatcherSpec, overlay: &MatcherSpec) -> MatcherSpec {
    let mut merged = base.matchers().to_vec();
    for (i, next) in overlay.iter().enumerate() {
        match merged.get_mut(i) {
            Some(existing) => *existing = existing.merged_with(next),
            None => merged.push(next.clone()),
        }
    }
    MatcherSpec::new(merged)
}

/// Load both request sources and merge them, file first.
///
/// Either source may be absent or empty. Whether the result may be empty is
/// the caller's decision.
///
/// # Errors
///
/// Propagates any load error from either source.
pub fn build_request(request_file: Option<&Path>, request_text: Option<&str>) -> Result<MatcherSpec> {
    let base = match request_file {
        Some(path) => load_from_file(path)?,
        None => MatcherSpec::default(),
    };
    let overlay = match request_text {
        Some(text) => load_from_text(text)?,
        None => MatcherSpec::default(),
    };

    let merged = merge(&base, &overlay);
    debug!(
        file = base.len(),
        text = overlay.len(),
        merged = merged.len(),
        "merged node matchers"
    );
    Ok(merged)
}

impl NodeMatcher {
    /// Proto-merge `overlay` into a copy of `self`.
    #[must_use]
    pub fn merged_with(&self, overlay: &NodeMatcher) -> NodeMatcher {
        let node_id = match (&self.node_id, &overlay.node_id) {
            (Some(base), Some(next)) => Some(base.merged_with(next)),
            (base, None) => base.clone(),
            (None, next) => next.clone(),
        };
        let node_metadatas = self
            .node_metadatas
            .iter()
            .chain(&overlay.node_metadatas)
            .cloned()
            .collect();
        NodeMatcher {
            node_id,
            node_metadatas,
        }
    }
}

impl StringMatcher {
    /// Proto-merge `overlay` into a copy of `self`.
    ///
    /// The pattern oneof is always set on `overlay`, so it wins. `ignore_case`
    /// only counts as set when `true`.
    #[must_use]
    pub fn merged_with(&self, overlay: &StringMatcher) -> StringMatcher {
        overlay
            .clone()
            .with_ignore_case(self.ignore_case() || overlay.ignore_case())
    }
}
