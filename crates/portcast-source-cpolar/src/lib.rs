//! cpolar tunnel-service client
//!
//! Implements [`TunnelSource`] against the cpolar HTTP API:
//!
//! - `POST /api/v1/user/login` with the account credentials returns a
//!   bearer token
//! - `GET /api/v1/tunnels` with that token lists tunnel groups; tunnels of
//!   groups whose status is `"active"` are flattened in listing order
//!
//! The response envelope carries an application-level code: 20000 is
//! success, 50014 means the bearer token has expired. The expiry code is
//! surfaced as [`Error::SessionExpired`] so the engine can re-authenticate;
//! any other non-success code becomes [`Error::TunnelApi`], and network or
//! decode failures become [`Error::Transport`].
//!
//! The client performs one request per call. Retry, re-login and scheduling
//! are owned by the engine.

use std::time::Duration;

use async_trait::async_trait;
use portcast_core::error::{Error, Result};
use portcast_core::traits::{Tunnel, TunnelSource};
use tokio::sync::Mutex;

mod wire;

use wire::{ApiResponse, Credential};

const API_LOGIN: &str = "/api/v1/user/login";
const API_TUNNELS: &str = "/api/v1/tunnels";

/// Application code for a successful response
const CODE_OK: i64 = 20000;

/// Application code for an expired session token
const CODE_SESSION_EXPIRED: i64 = 50014;

/// Group status whose tunnels participate in the mapping
const STATUS_ACTIVE: &str = "active";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// cpolar API client holding the account credentials and, after a
/// successful login, the session token
pub struct CpolarSource {
    /// Base URL of the cpolar deployment, without a trailing slash
    base_url: String,

    /// Account credentials
    /// ⚠️ the password must never appear in logs
    credential: Credential,

    /// Bearer token from the last successful login
    token: Mutex<Option<String>>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the password and token
impl std::fmt::Debug for CpolarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpolarSource")
            .field("base_url", &self.base_url)
            .field("username", &self.credential.username)
            .field("password", &"<REDACTED>")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl CpolarSource {
    /// Create a new client for the deployment at `base_url`
    ///
    /// Fails with a configuration error when the URL or either credential
    /// is empty.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let username = username.into();
        let password = password.into();

        if base_url.is_empty() {
            return Err(Error::config("cpolar base URL cannot be empty"));
        }
        if username.is_empty() || password.is_empty() {
            return Err(Error::config("cpolar credentials cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: Credential { username, password },
            token: Mutex::new(None),
            client,
        })
    }
}

#[async_trait]
impl TunnelSource for CpolarSource {
    async fn login(&self) -> Result<()> {
        let url = format!("{}{API_LOGIN}", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.credential)
            .send()
            .await
            .map_err(|e| Error::auth(format!("login request failed: {e}")))?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("undecodable login response: {e}")))?;

        if body.code != CODE_OK {
            return Err(Error::auth(format!(
                "login rejected ({}): {}",
                body.code, body.message
            )));
        }
        if body.data.token.is_empty() {
            return Err(Error::auth("login response carried no token"));
        }

        *self.token.lock().await = Some(body.data.token);
        tracing::debug!("obtained cpolar session token");
        Ok(())
    }

    async fn active_tunnels(&self) -> Result<Vec<Tunnel>> {
        let token = self
            .token
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::auth("no session token, login first"))?;

        let url = format!("{}{API_TUNNELS}", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Error::transport(format!("tunnel listing request failed: {e}")))?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("undecodable tunnel listing: {e}")))?;

        collect_active(body)
    }

    fn source_name(&self) -> &'static str {
        "cpolar"
    }
}

/// Classify a tunnel-listing envelope and flatten the active groups
fn collect_active(response: ApiResponse) -> Result<Vec<Tunnel>> {
    match response.code {
        CODE_OK => {
            tracing::debug!(total = response.data.total, "tunnel listing received");

            let mut tunnels = Vec::new();
            for group in response.data.items {
                if group.status != STATUS_ACTIVE {
                    tracing::debug!(
                        group = %group.name,
                        status = %group.status,
                        "skipping inactive tunnel group"
                    );
                    continue;
                }
                tunnels.extend(
                    group
                        .publish_tunnels
                        .into_iter()
                        .map(|t| Tunnel::new(t.name, t.proto, t.addr, t.public_url)),
                );
            }
            Ok(tunnels)
        }
        CODE_SESSION_EXPIRED => Err(Error::session_expired(response.message)),
        code => Err(Error::tunnel_api(code, response.message)),
    }
}
