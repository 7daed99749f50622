//! Closed registry of payload types the exporter can expand.
//!
//! Config dumps carry resources as `google.protobuf.Any`, which proto JSON
//! renders as an object with an `@type` key next to the message's fields. To
//! expand such a payload the exporter needs the message's schema; this module
//! maps a type URL to a [`SchemaDescriptor`] by exact name.
//!
//! The table is compiled in. A type URL that is not in it resolves to `None`,
//! and the exporter falls back to emitting the payload untouched.
//!
//! Lookup is by the full type URL, exactly as it appears in `@type`:
//!
//! ```
//! let cluster = csds::resolve("type.googleapis.com/envoy.api.v2.Cluster").unwrap();
//! assert_eq!(cluster.full_name(), "envoy.api.v2.Cluster");
//! assert!(csds::resolve("envoy.api.v2.Cluster").is_none());
//! assert!(csds::resolve("type.googleapis.com/envoy.config.route.v3.ScopedRouteConfiguration").is_none());
//! ```

use serde_json::{Map, Value};

/// Prefix of fully-qualified `Any` type URLs.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Schema of one registered message type: its full name and top-level fields.
#[derive(Debug, PartialEq, Eq)]
pub struct SchemaDescriptor {
    full_name: &'static str,
    fields: &'static [&'static str],
}

impl SchemaDescriptor {
    /// Fully-qualified proto message name.
    #[must_use]
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// The `type.googleapis.com/` URL for this message.
    #[must_use]
    pub fn type_url(&self) -> String {
        format!("{TYPE_URL_PREFIX}{}", self.full_name)
    }

    /// Top-level field names, in proto (snake_case) spelling.
    #[must_use]
    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// The proto JSON name for `key`, if `key` names a field of this message
    /// in either spelling.
    #[must_use]
    pub fn json_name(&self, key: &str) -> Option<String> {
        self.fields.iter().find_map(|field| {
            let json = to_json_name(field);
            (*field == key || json == key).then_some(json)
        })
    }

    /// Rename every known field of `payload` to its JSON name.
    ///
    /// Unknown keys are kept as they are.
    #[must_use]
    pub fn normalize(&self, payload: Map<String, Value>) -> Map<String, Value> {
        payload
            .into_iter()
            .map(|(key, value)| match self.json_name(&key) {
                Some(json) => (json, value),
                None => (key, value),
            })
            .collect()
    }
}

/// Resolve a type URL to its schema.
///
/// Only the exact `type.googleapis.com/<name>` spelling resolves. Anything
/// else returns `None`; this is not an error.
#[must_use]
pub fn resolve(type_url: &str) -> Option<&'static SchemaDescriptor> {
    let name = type_url.strip_prefix(TYPE_URL_PREFIX)?;
    SCHEMAS.iter().find(|s| s.full_name == name)
}

/// All registered type URLs, fully qualified.
pub fn type_urls() -> impl Iterator<Item = String> {
    SCHEMAS.iter().map(SchemaDescriptor::type_url)
}

/// protoc's `ToJsonName`: drop underscores and capitalize the next letter.
fn to_json_name(proto_name: &str) -> String {
    let mut out = String::with_capacity(proto_name.len());
    let mut upper_next = false;
    for c in proto_name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registered schemas
// ═══════════════════════════════════════════════════════════════════════════════

static SCHEMAS: &[SchemaDescriptor] = &[
    SchemaDescriptor {
        full_name: "envoy.config.filter.network.http_connection_manager.v2.HttpConnectionManager",
        fields: &[
            "codec_type",
            "stat_prefix",
            "rds",
            "route_config",
            "scoped_routes",
            "http_filters",
            "add_user_agent",
            "tracing",
            "common_http_protocol_options",
            "http_protocol_options",
            "http2_protocol_options",
            "server_name",
            "server_header_transformation",
            "max_request_headers_kb",
            "idle_timeout",
            "stream_idle_timeout",
            "request_timeout",
            "drain_timeout",
            "delayed_close_timeout",
            "access_log",
            "use_remote_address",
            "xff_num_trusted_hops",
            "internal_address_config",
            "skip_xff_append",
            "via",
            "generate_request_id",
            "preserve_external_request_id",
            "forward_client_cert_details",
            "set_current_client_cert_details",
            "proxy_100_continue",
            "represent_ipv4_remote_address_as_ipv4_mapped_ipv6",
            "upgrade_configs",
            "normalize_path",
            "merge_slashes",
            "request_id_extension",
        ],
    },
    SchemaDescriptor {
        full_name: "envoy.api.v2.Cluster",
        fields: &[
            "transport_socket_matches",
            "name",
            "alt_stat_name",
            "type",
            "cluster_type",
            "eds_cluster_config",
            "connect_timeout",
            "per_connection_buffer_limit_bytes",
            "lb_policy",
            "hosts",
            "load_assignment",
            "health_checks",
            "max_requests_per_connection",
            "circuit_breakers",
            "tls_context",
            "upstream_http_protocol_options",
            "common_http_protocol_options",
            "http_protocol_options",
            "http2_protocol_options",
            "extension_protocol_options",
            "typed_extension_protocol_options",
            "dns_refresh_rate",
            "dns_failure_refresh_rate",
            "respect_dns_ttl",
            "dns_lookup_family",
            "dns_resolvers",
            "use_tcp_for_dns_lookups",
            "outlier_detection",
            "cleanup_interval",
            "upstream_bind_config",
            "lb_subset_config",
            "ring_hash_lb_config",
            "original_dst_lb_config",
            "least_request_lb_config",
            "common_lb_config",
            "transport_socket",
            "metadata",
            "protocol_selection",
            "upstream_connection_options",
            "close_connections_on_host_health_failure",
            "drain_connections_on_host_removal",
            "filters",
            "load_balancing_policy",
            "lrs_server",
            "track_timeout_budgets",
        ],
    },
    SchemaDescriptor {
        full_name: "envoy.api.v2.Listener",
        fields: &[
            "name",
            "address",
            "filter_chains",
            "use_original_dst",
            "per_connection_buffer_limit_bytes",
            "metadata",
            "deprecated_v1",
            "drain_type",
            "listener_filters",
            "listener_filters_timeout",
            "continue_on_listener_filters_timeout",
            "transparent",
            "freebind",
            "socket_options",
            "tcp_fast_open_queue_length",
            "traffic_direction",
            "udp_listener_config",
            "api_listener",
            "connection_balance_config",
            "reuse_port",
            "access_log",
        ],
    },
    SchemaDescriptor {
        full_name: "envoy.config.filter.http.router.v2.Router",
        fields: &[
            "dynamic_stats",
            "start_child_span",
            "upstream_log",
            "suppress_envoy_headers",
            "strict_check_headers",
            "respect_expected_rq_timeout",
        ],
    },
    SchemaDescriptor {
        full_name: "envoy.api.v2.RouteConfiguration",
        fields: &[
            "name",
            "virtual_hosts",
            "vhds",
            "internal_only_headers",
            "response_headers_to_add",
            "response_headers_to_remove",
            "request_headers_to_add",
            "request_headers_to_remove",
            "most_specific_header_mutations_wins",
            "validate_clusters",
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_every_registered_type() {
        for url in type_urls() {
            let schema = resolve(&url).unwrap();
            assert_eq!(schema.type_url(), url);
            assert_eq!(resolve(&url), Some(schema));
        }
        assert_eq!(type_urls().count(), 5);
    }

    #[test]
    fn resolve_is_exact() {
        assert!(resolve("type.googleapis.com/envoy.api.v2.Cluster").is_some());
        assert!(resolve("envoy.api.v2.Cluster").is_none());
        assert!(resolve("type.googleapis.com/envoy.api.v2.Clusters").is_none());
        assert!(resolve("type.googleapis.com/envoy.api.v2.cluster").is_none());
        assert!(resolve("example.com/envoy.api.v2.Cluster").is_none());
        assert!(resolve(" type.googleapis.com/envoy.api.v2.Cluster").is_none());
        assert!(resolve("type.googleapis.com/").is_none());
        assert!(resolve("").is_none());
        assert!(resolve("type.googleapis.com/envoy.config.cluster.v3.Cluster").is_none());
    }

    #[test]
    fn json_name_accepts_both_spellings() {
        let cluster = resolve("type.googleapis.com/envoy.api.v2.Cluster").unwrap();
        assert_eq!(cluster.json_name("connect_timeout").as_deref(), Some("connectTimeout"));
        assert_eq!(cluster.json_name("connectTimeout").as_deref(), Some("connectTimeout"));
        assert_eq!(cluster.json_name("bogus_field"), None);
    }

    #[test]
    fn to_json_name_matches_protoc() {
        assert_eq!(to_json_name("name"), "name");
        assert_eq!(to_json_name("eds_cluster_config"), "edsClusterConfig");
        assert_eq!(to_json_name("proxy_100_continue"), "proxy100Continue");
        assert_eq!(
            to_json_name("represent_ipv4_remote_address_as_ipv4_mapped_ipv6"),
            "representIpv4RemoteAddressAsIpv4MappedIpv6"
        );
    }

    #[test]
    fn normalize_renames_known_fields_only() {
        let router = resolve("type.googleapis.com/envoy.config.filter.http.router.v2.Router").unwrap();
        let payload = json!({ "dynamic_stats": true, "x_custom": 1 });
        let Value::Object(payload) = payload else {
            unreachable!()
        };
        assert_eq!(
            Value::Object(router.normalize(payload)),
            json!({ "dynamicStats": true, "x_custom": 1 })
        );
    }
}
