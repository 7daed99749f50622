//! The CSDS round trip, behind a trait.
//!
//! A real client streams `ClientStatusRequest`s to the control plane over
//! gRPC. [`ReplayClient`] answers from a recorded response instead, applying
//! the request's node matchers the way the control plane would.

use crate::{ClientStatusResponse, Error, MatcherSpec, NodeMatcher, Result};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// A CSDS query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatusRequest {
    /// Clients matching any of these are returned.
    pub node_matchers: Vec<NodeMatcher>,
}

impl ClientStatusRequest {
    /// Build a request from merged matchers.
    #[must_use]
    pub fn new(matchers: MatcherSpec) -> Self {
        Self {
            node_matchers: matchers.into_matchers(),
        }
    }

    /// Returns `true` if a client with this node would be selected.
    ///
    /// An empty matcher list selects every client; otherwise at least one
    /// matcher must match and clients without a node are never selected.
    #[must_use]
    pub fn selects(&self, node: Option<&crate::Node>) -> bool {
        if self.node_matchers.is_empty() {
            return true;
        }
        node.is_some_and(|node| self.node_matchers.iter().any(|m| m.matches(node)))
    }
}

/// Sends a [`ClientStatusRequest`] and returns the control plane's answer.
pub trait StatusClient {
    /// Perform one status query.
    ///
    /// # Errors
    ///
    /// Implementation-specific transport or decoding errors.
    fn fetch(&mut self, request: &ClientStatusRequest) -> Result<ClientStatusResponse>;
}

/// Answers queries from a recorded `ClientStatusResponse`.
#[derive(Debug, Clone)]
pub struct ReplayClient {
    recorded: ClientStatusResponse,
}

impl ReplayClient {
    /// Replay a response already in memory.
    #[must_use]
    pub fn new(recorded: ClientStatusResponse) -> Self {
        Self { recorded }
    }

    /// Replay a proto-JSON response file.
    ///
    /// # Errors
    ///
    /// - [`Error::Read`] if the file cannot be read
    /// - [`Error::InvalidResponse`] if it is not a valid response
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ClientStatusResponse::from_json(&json).map(Self::new)
    }
}

impl StatusClient for ReplayClient {
    fn fetch(&mut self, request: &ClientStatusRequest) -> Result<ClientStatusResponse> {
        let config: Vec<_> = self
            .recorded
            .config
            .iter()
            .filter(|client| request.selects(client.node.as_ref()))
            .cloned()
            .collect();
        debug!(
            recorded = self.recorded.config.len(),
            selected = config.len(),
            "replayed client status"
        );
        Ok(ClientStatusResponse { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientConfig, Node, StringMatcher};

    fn recorded() -> ClientStatusResponse {
        ClientStatusResponse {
            config: vec![
                ClientConfig {
                    node: Some(Node::new("sidecar~1")),
                    xds_config: vec![],
                },
                ClientConfig {
                    node: Some(Node::new("router~1")),
                    xds_config: vec![],
                },
                ClientConfig {
                    node: None,
                    xds_config: vec![],
                },
            ],
        }
    }

    fn ids(response: &ClientStatusResponse) -> Vec<Option<&str>> {
        response
            .config
            .iter()
            .map(|c| c.node.as_ref().map(|n| n.id.as_str()))
            .collect()
    }

    #[test]
    fn empty_request_returns_everything() {
        let mut client = ReplayClient::new(recorded());
        let response = client.fetch(&ClientStatusRequest::default()).unwrap();
        assert_eq!(response, recorded());
    }

    #[test]
    fn matchers_are_ored() {
        let mut client = ReplayClient::new(recorded());
        let request = ClientStatusRequest::new(MatcherSpec::new(vec![
            NodeMatcher::with_node_id(StringMatcher::prefix("sidecar~")),
            NodeMatcher::with_node_id(StringMatcher::exact("router~1")),
        ]));
        let response = client.fetch(&request).unwrap();
        assert_eq!(ids(&response), vec![Some("sidecar~1"), Some("router~1")]);
    }

    #[test]
    fn nothing_matches() {
        let mut client = ReplayClient::new(recorded());
        let request = ClientStatusRequest::new(MatcherSpec::new(vec![NodeMatcher::with_node_id(
            StringMatcher::exact("nobody"),
        )]));
        assert!(client.fetch(&request).unwrap().config.is_empty());
    }

    #[test]
    fn request_serializes_as_proto_json() {
        let request = ClientStatusRequest::new(MatcherSpec::new(vec![NodeMatcher::with_node_id(
            StringMatcher::exact("n"),
        )]));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "nodeMatchers": [{ "nodeId": { "exact": "n" } }] })
        );
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ReplayClient::from_file("/no/such/response.json").unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn malformed_file_is_invalid_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        std::fs::write(&path, r#"{"config": [{"xdsConfig": "nope"}]}"#).unwrap();
        let err = ReplayClient::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }
}
