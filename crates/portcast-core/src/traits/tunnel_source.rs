//! Tunnel source trait
//!
//! Defines the interface for authenticating to and polling the tunnel
//! service. The engine owns all retry and scheduling decisions; a source
//! performs one login or one listing per call and reports failures through
//! the error taxonomy so the engine can pick the right recovery path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One active tunnel exposed by the tunnel service
///
/// `addr` is the local `host:port` the tunnel forwards to, `public_url` the
/// public endpoint (`scheme://host:port`). Sources only hand the engine
/// tunnels belonging to active groups, so there is no status field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    /// Logical tunnel name
    pub name: String,

    /// Tunnel protocol (e.g. "tcp", "http")
    pub proto: String,

    /// Local address in `host:port` form
    pub addr: String,

    /// Public address in `scheme://host:port` form
    pub public_url: String,
}

impl Tunnel {
    /// Create a new tunnel descriptor
    pub fn new(
        name: impl Into<String>,
        proto: impl Into<String>,
        addr: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            proto: proto.into(),
            addr: addr.into(),
            public_url: public_url.into(),
        }
    }
}

/// Trait for tunnel service clients
///
/// Implementations hold the session state (credentials and bearer token)
/// behind `&self`; the engine is the only caller and drives login and
/// polling strictly sequentially.
///
/// # Error classification
///
/// The engine branches on the returned variant, so implementations must
/// classify carefully:
///
/// - [`login`](TunnelSource::login) fails with [`Error::Auth`] on transport
///   failure or an unusable response; the engine cools down and retries.
/// - [`active_tunnels`](TunnelSource::active_tunnels) distinguishes
///   [`Error::SessionExpired`] (the service's well-known expiry code; the
///   engine re-logs-in) from [`Error::TunnelApi`] (any other non-success
///   code) and [`Error::Transport`] (network/decode failure), both of which
///   the engine retries after the poll interval.
///
/// [`Error::Auth`]: crate::Error::Auth
/// [`Error::SessionExpired`]: crate::Error::SessionExpired
/// [`Error::TunnelApi`]: crate::Error::TunnelApi
/// [`Error::Transport`]: crate::Error::Transport
#[async_trait]
pub trait TunnelSource: Send + Sync {
    /// Authenticate with the stored credentials and keep the resulting
    /// session token for subsequent listings
    async fn login(&self) -> Result<(), crate::Error>;

    /// List the tunnels of all currently active tunnel groups, flattened in
    /// listing order
    async fn active_tunnels(&self) -> Result<Vec<Tunnel>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
