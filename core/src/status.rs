//! The `ClientStatusResponse` model.
//!
//! Only the parts the summary needs are typed: node identity, node metadata,
//! and the sync status plus kind of each per-xDS entry. Config dumps stay
//! untyped JSON so that the export can reproduce them field for field.

use crate::{null_as_default, STREAM_TYPE_METADATA_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The answer to a CSDS query: one entry per connected xDS client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientStatusResponse {
    /// Client configs, in control-plane order.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub config: Vec<ClientConfig>,
}

impl ClientStatusResponse {
    /// Decode a proto-JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`](crate::Error::InvalidResponse) on malformed input.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::InvalidResponse {
            reason: e.to_string(),
        })
    }

    /// Returns `true` if any client reports at least one per-xDS entry.
    #[must_use]
    pub fn has_xds_config(&self) -> bool {
        self.config.iter().any(|c| !c.xds_config.is_empty())
    }
}

/// Status of a single xDS client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ClientConfig {
    /// The client's node identity. Absent when the control plane lost it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,

    /// Per-xDS sync status, in control-plane order.
    #[serde(
        default,
        alias = "xds_config",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub xds_config: Vec<PerXdsConfig>,
}

/// An envoy `core.Node`.
///
/// Fields other than `id` and `metadata` are carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Opaque node identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Node metadata (a `google.protobuf.Struct`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// Everything else (`cluster`, `locality`, `userAgentName`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Create a node with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Add a metadata entry (builder pattern).
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// The stream type the control plane reports under `XDS_STREAM_TYPE`.
    #[must_use]
    pub fn stream_type(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get(STREAM_TYPE_METADATA_KEY)
            .and_then(Value::as_str)
    }
}

/// The four xDS resource kinds a client reports status for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XdsKind {
    /// Listener discovery.
    Listener,
    /// Cluster discovery.
    Cluster,
    /// Route discovery.
    Route,
    /// Scoped route discovery.
    ScopedRoute,
}

impl XdsKind {
    /// The short tag shown in the summary table.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Listener => "LDS",
            Self::Cluster => "CDS",
            Self::Route => "RDS",
            Self::ScopedRoute => "SRDS",
        }
    }
}

impl fmt::Display for XdsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One populated arm of the `per_xds_config` oneof.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDump {
    /// Which arm was populated.
    pub kind: XdsKind,
    /// The config dump, untyped. Nested `@type` payloads are resolved at export.
    pub dump: Value,
}

/// Sync status of one xDS resource kind on one client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PerXdsConfigWire", into = "PerXdsConfigWire")]
pub struct PerXdsConfig {
    /// Status name as reported (`SYNCED`, `STALE`, ...).
    ///
    /// An absent status reads as `UNKNOWN`, the enum default. Only an
    /// explicitly empty status hides the entry from the summary.
    pub status: String,
    /// The populated config arm, if any.
    pub config: Option<ConfigDump>,
}

impl PerXdsConfig {
    /// Create an entry with a status and a config dump.
    pub fn new(status: impl Into<String>, kind: XdsKind, dump: Value) -> Self {
        Self {
            status: status.into(),
            config: Some(ConfigDump { kind, dump }),
        }
    }

    /// The kind of the populated arm.
    #[must_use]
    pub fn kind(&self) -> Option<XdsKind> {
        self.config.as_ref().map(|c| c.kind)
    }

    /// `"<TAG>   <STATUS>"`, or `None` when the kind or status is missing.
    #[must_use]
    pub fn status_line(&self) -> Option<String> {
        let kind = self.kind()?;
        if self.status.is_empty() {
            return None;
        }
        Some(format!("{kind}   {}", self.status))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Proto JSON shape
// ═══════════════════════════════════════════════════════════════════════════════

/// `ConfigStatus` enum names by number.
const CONFIG_STATUS_NAMES: [&str; 5] = ["UNKNOWN", "SYNCED", "NOT_SENT", "STALE", "ERROR"];

/// The enum default, which proto JSON leaves out.
const DEFAULT_STATUS: &str = CONFIG_STATUS_NAMES[0];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct PerXdsConfigWire {
    #[serde(
        default,
        deserialize_with = "deserialize_status",
        skip_serializing_if = "Option::is_none"
    )]
    status: Option<String>,
    #[serde(default, alias = "listener_config", skip_serializing_if = "Option::is_none")]
    listener_config: Option<Value>,
    #[serde(default, alias = "cluster_config", skip_serializing_if = "Option::is_none")]
    cluster_config: Option<Value>,
    #[serde(default, alias = "route_config", skip_serializing_if = "Option::is_none")]
    route_config: Option<Value>,
    #[serde(default, alias = "scoped_route_config", skip_serializing_if = "Option::is_none")]
    scoped_route_config: Option<Value>,
}

/// Proto JSON allows enum values by name or by number.
fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NameOrNumber {
        Name(String),
        Number(i64),
    }

    match Option::<NameOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NameOrNumber::Name(name)) => Ok(Some(name)),
        Some(NameOrNumber::Number(n)) => usize::try_from(n)
            .ok()
            .and_then(|i| CONFIG_STATUS_NAMES.get(i))
            .map(|name| Some((*name).to_owned()))
            .ok_or_else(|| <D::Error as serde::de::Error>::custom(format!("unknown config status {n}"))),
    }
}

impl TryFrom<PerXdsConfigWire> for PerXdsConfig {
    type Error = String;

    fn try_from(wire: PerXdsConfigWire) -> Result<Self, Self::Error> {
        let status = wire.status.unwrap_or_else(|| DEFAULT_STATUS.to_owned());

        let mut arms = [
            wire.listener_config.map(|dump| ConfigDump {
                kind: XdsKind::Listener,
                dump,
            }),
            wire.cluster_config.map(|dump| ConfigDump {
                kind: XdsKind::Cluster,
                dump,
            }),
            wire.route_config.map(|dump| ConfigDump {
                kind: XdsKind::Route,
                dump,
            }),
            wire.scoped_route_config.map(|dump| ConfigDump {
                kind: XdsKind::ScopedRoute,
                dump,
            }),
        ]
        .into_iter()
        .flatten();

        let config = arms.next();
        if arms.next().is_some() {
            return Err("per-xDS config sets more than one of listener_config, \
                        cluster_config, route_config, scoped_route_config"
                .into());
        }

        Ok(Self { status, config })
    }
}

impl From<PerXdsConfig> for PerXdsConfigWire {
    fn from(c: PerXdsConfig) -> Self {
        let mut wire = Self {
            status: (c.status != DEFAULT_STATUS).then_some(c.status),
            ..Self::default()
        };
        if let Some(ConfigDump { kind, dump }) = c.config {
            let slot = match kind {
                XdsKind::Listener => &mut wire.listener_config,
                XdsKind::Cluster => &mut wire.cluster_config,
                XdsKind::Route => &mut wire.route_config,
                XdsKind::ScopedRoute => &mut wire.scoped_route_config,
            };
            *slot = Some(dump);
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_type_from_metadata() {
        let node = Node::new("n1").with_metadata(STREAM_TYPE_METADATA_KEY, "ADS");
        assert_eq!(node.stream_type(), Some("ADS"));

        let node = Node::new("n1").with_metadata(STREAM_TYPE_METADATA_KEY, 3);
        assert_eq!(node.stream_type(), None);
        assert_eq!(Node::new("n1").stream_type(), None);
    }

    #[test]
    fn node_keeps_unmodelled_fields() {
        let value = json!({
            "id": "n1",
            "cluster": "c1",
            "locality": { "zone": "us-central1-a" },
            "metadata": { "XDS_STREAM_TYPE": "ADS" }
        });
        let node: Node = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(node.extra.len(), 2);
        assert_eq!(serde_json::to_value(&node).unwrap(), value);
    }

    #[test]
    fn per_xds_config_picks_populated_arm() {
        let c: PerXdsConfig = serde_json::from_value(json!({
            "status": "STALE",
            "routeConfig": { "dynamicRouteConfigs": [] }
        }))
        .unwrap();
        assert_eq!(c.kind(), Some(XdsKind::Route));
        assert_eq!(c.status_line().as_deref(), Some("RDS   STALE"));
    }

    #[test]
    fn per_xds_config_accepts_numeric_status() {
        let c: PerXdsConfig =
            serde_json::from_value(json!({ "status": 1, "cluster_config": {} })).unwrap();
        assert_eq!(c.status, "SYNCED");
        assert!(serde_json::from_value::<PerXdsConfig>(json!({ "status": 9 })).is_err());
    }

    #[test]
    fn absent_status_is_unknown() {
        let absent: PerXdsConfig =
            serde_json::from_value(json!({ "clusterConfig": {} })).unwrap();
        let zero: PerXdsConfig =
            serde_json::from_value(json!({ "status": 0, "clusterConfig": {} })).unwrap();
        assert_eq!(absent, zero);
        assert_eq!(absent.status_line().as_deref(), Some("CDS   UNKNOWN"));

        let empty: PerXdsConfig =
            serde_json::from_value(json!({ "status": "", "clusterConfig": {} })).unwrap();
        assert_eq!(empty.status_line(), None);
    }

    #[test]
    fn unknown_status_is_left_out_when_written() {
        let c = PerXdsConfig::new("UNKNOWN", XdsKind::Cluster, json!({}));
        assert_eq!(serde_json::to_value(&c).unwrap(), json!({ "clusterConfig": {} }));

        let c = PerXdsConfig::new("", XdsKind::Cluster, json!({}));
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value, json!({ "status": "", "clusterConfig": {} }));
        assert_eq!(serde_json::from_value::<PerXdsConfig>(value).unwrap(), c);
    }

    #[test]
    fn per_xds_config_rejects_two_arms() {
        let err = serde_json::from_value::<PerXdsConfig>(json!({
            "status": "SYNCED",
            "listenerConfig": {},
            "clusterConfig": {}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn status_line_requires_kind_and_status() {
        let no_status = PerXdsConfig::new("", XdsKind::Cluster, json!({}));
        assert_eq!(no_status.status_line(), None);

        let no_kind = PerXdsConfig {
            status: "SYNCED".into(),
            config: None,
        };
        assert_eq!(no_kind.status_line(), None);

        let srds = PerXdsConfig::new("ERROR", XdsKind::ScopedRoute, json!({}));
        assert_eq!(srds.status_line().as_deref(), Some("SRDS   ERROR"));
    }

    #[test]
    fn has_xds_config_ors_across_clients() {
        let mut response = ClientStatusResponse {
            config: vec![ClientConfig {
                node: Some(Node::new("a")),
                xds_config: vec![],
            }],
        };
        assert!(!response.has_xds_config());

        response.config.push(ClientConfig {
            node: None,
            xds_config: vec![PerXdsConfig::new("SYNCED", XdsKind::Listener, json!({}))],
        });
        assert!(response.has_xds_config());
    }

    #[test]
    fn round_trips_through_json() {
        let value = json!({
            "config": [{
                "node": { "id": "n1" },
                "xdsConfig": [
                    { "status": "SYNCED", "clusterConfig": { "versionInfo": "1" } },
                    { "scopedRouteConfig": {} }
                ]
            }]
        });
        let response: ClientStatusResponse = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&response).unwrap(), value);
    }
}
