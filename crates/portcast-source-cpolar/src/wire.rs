//! Wire types for the cpolar HTTP API
//!
//! Every endpoint answers with the same envelope: a `data` payload, an
//! application-level `code` and an optional `message`. The login payload
//! carries the session token; the tunnel listing carries tunnel groups,
//! each wrapping the tunnels it currently publishes.

use serde::{Deserialize, Serialize};

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Credential {
    #[serde(rename = "email")]
    pub username: String,
    pub password: String,
}

/// One published tunnel inside a tunnel group
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireTunnel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub proto: String,
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub public_url: String,
}

/// One tunnel group in the listing
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TunnelGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub publish_tunnels: Vec<WireTunnel>,
}

/// `data` payload of the response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Payload {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub items: Vec<TunnelGroup>,
}

/// Response envelope shared by all endpoints
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub data: Payload,
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
