//! csds: client-side core for the xDS Client Status Discovery Service
//!
//! A CSDS query is a list of node matchers; the answer is a
//! `ClientStatusResponse` describing every xDS client the control plane knows
//! about. This crate owns the two transformations around that round trip:
//!
//! 1. **Request building**: load node matchers from a request file and from
//!    inline text (JSON or YAML), then merge them positionally.
//! 2. **Response rendering**: summarize the response as a fixed-width table
//!    and export the full response as pretty JSON, expanding `@type` payloads
//!    through a closed type registry.
//!
//! The network call itself sits behind the [`StatusClient`] trait.
//!
//! # Example
//!
//! ```
//! use csds::prelude::*;
//!
//! let file = MatcherSpec::default();
//! let text = load_from_text(r#"{"node_matchers": [{"node_id": {"exact": "proxy-1"}}]}"#).unwrap();
//! let request = merge(&file, &text);
//! assert_eq!(request.len(), 1);
//!
//! let response = ClientStatusResponse::default();
//! let summary = summarize(&response);
//!
//! let mut out = Vec::new();
//! render(&summary, &mut out).unwrap();
//! assert_eq!(out, b"No xDS clients connected.\n");
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod export;
mod loader;
mod merge;
mod node_matcher;
mod registry;
mod status;
mod string_match;
mod summary;
mod transport;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use export::{export, to_pretty_json, Destination, DETAILED_CONFIG_HEADER};
pub use loader::{is_json, load_from_file, load_from_text};
pub use merge::{build_request, merge};
pub use node_matcher::{
    metadata_value, MatcherSpec, NodeMatcher, PathSegment, StructMatcher, ValueMatcher,
};
pub use registry::{resolve, type_urls, SchemaDescriptor, TYPE_URL_PREFIX};
pub use status::{ClientConfig, ClientStatusResponse, ConfigDump, Node, PerXdsConfig, XdsKind};
pub use string_match::{MatchPattern, StringMatcher};
pub use summary::{render, summarize, DisplayRow, Summary, NOT_AVAILABLE, NO_CLIENTS};
pub use transport::{ClientStatusRequest, ReplayClient, StatusClient};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use csds::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Request building
        build_request,
        export,
        load_from_file,
        load_from_text,
        merge,
        // Response rendering
        render,
        summarize,
        // Types
        ClientConfig,
        ClientStatusRequest,
        ClientStatusResponse,
        Destination,
        // Errors
        Error,
        MatcherSpec,
        Node,
        NodeMatcher,
        PerXdsConfig,
        ReplayClient,
        StatusClient,
        StringMatcher,
        StructMatcher,
        Summary,
        ValueMatcher,
        XdsKind,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Node metadata key the control plane uses to report a client's stream type.
pub const STREAM_TYPE_METADATA_KEY: &str = "XDS_STREAM_TYPE";

/// Node metadata key carrying the Traffic Director GCP project number.
pub const GCP_PROJECT_NUMBER_KEY: &str = "TRAFFICDIRECTOR_GCP_PROJECT_NUMBER";

/// Node metadata key carrying the Traffic Director network name.
pub const NETWORK_NAME_KEY: &str = "TRAFFICDIRECTOR_NETWORK_NAME";

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from request building, response loading, and export.
///
/// Unresolved payload types are not errors; see [`resolve`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request or response file could not be read.
    #[error("failed to read \"{}\": {source}", .path.display())]
    Read {
        /// The file that failed.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The matcher document as a whole is malformed.
    #[error("invalid node matcher document: {reason}")]
    InvalidDocument {
        /// What was wrong with the document.
        reason: String,
    },

    /// One node matcher inside an otherwise well-formed document is malformed.
    #[error("invalid node matcher at index {index}: {reason}")]
    InvalidMatcher {
        /// Position of the matcher within `node_matchers`.
        index: usize,
        /// What was wrong with the matcher.
        reason: String,
    },

    /// Neither request source supplied a node matcher.
    #[error("no node matchers given; pass a request file or inline request text")]
    MissingNodeMatchers,

    /// A recorded status response could not be decoded.
    #[error("invalid client status response: {reason}")]
    InvalidResponse {
        /// What was wrong with the response.
        reason: String,
    },

    /// The export file could not be created or written.
    #[error("failed to write \"{}\": {source}", .path.display())]
    Write {
        /// The export destination.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing to the output stream failed.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    /// The response could not be serialized.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// ═══════════════════════════════════════════════════════════════════════════════
// Serde helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Deserializes an explicit JSON `null` as the type's default.
///
/// Proto JSON treats `null` on a repeated or message field as "unset".
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    use serde::Deserialize;
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
