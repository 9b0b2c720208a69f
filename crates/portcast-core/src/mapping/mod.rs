//! Port-mapping snapshot builder
//!
//! Derives the canonical source-port → destination-port table from a tunnel
//! listing. Building a snapshot is pure and infallible: tunnels whose
//! addresses yield no usable port token are silently skipped, and an empty
//! listing yields an empty map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::traits::Tunnel;

/// Extract the trailing `:`-separated segment of an address
///
/// `"0.0.0.0:8080"` → `"8080"`, `"tcp://x.com:14783"` → `"14783"`. An
/// address without a `:` is its own trailing segment, and only the empty
/// string yields an empty token.
pub fn extract_port(addr: &str) -> &str {
    addr.rsplit(':').next().unwrap_or_default()
}

/// Canonical port-mapping table: source port → destination port
///
/// Keys are the trailing port tokens of the local addresses, values those of
/// the public addresses. Backed by a `BTreeMap`, so equality is key/value
/// set equality (insertion order is irrelevant) and the JSON encoding is
/// deterministic with sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortMap(BTreeMap<String, String>);

impl PortMap {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of port pairs in the mapping
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mapping holds no pairs
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Destination port for a source port, if mapped
    pub fn get(&self, source_port: &str) -> Option<&str> {
        self.0.get(source_port).map(String::as_str)
    }

    /// Insert a source → destination pair, replacing any previous value
    pub fn insert(&mut self, source_port: impl Into<String>, dest_port: impl Into<String>) {
        self.0.insert(source_port.into(), dest_port.into());
    }

    /// Iterate the pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PortMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build the port-mapping snapshot for a tunnel listing
///
/// A pair is included only when both the local and the public address yield
/// a non-empty trailing port token. Duplicate source ports keep the last
/// listed destination.
pub fn build_mapping(tunnels: &[Tunnel]) -> PortMap {
    let mut mapping = PortMap::new();

    for tunnel in tunnels {
        let src_port = extract_port(&tunnel.addr);
        let dst_port = extract_port(&tunnel.public_url);
        if !src_port.is_empty() && !dst_port.is_empty() {
            mapping.insert(src_port, dst_port);
        }
    }

    mapping
}
