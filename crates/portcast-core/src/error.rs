//! Error types for the portcast system
//!
//! The variants mirror the failure classes the engine branches on: login
//! failures cool down and retry, polling failures retry after the poll
//! interval, session expiry forces a re-login, and DNS publish failures are
//! fatal.

use thiserror::Error;

/// Result type alias for portcast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the portcast system
#[derive(Error, Debug)]
pub enum Error {
    /// Login against the tunnel service failed (transport failure or an
    /// unusable response)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The tunnel service reported that the bearer token is no longer valid
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// The tunnel service answered with a non-success application code
    #[error("tunnel API error ({code}): {message}")]
    TunnelApi {
        /// Application-level response code
        code: i64,
        /// Message carried alongside the code
        message: String,
    },

    /// Network or decode failure while talking to the tunnel service
    #[error("transport error: {0}")]
    Transport(String),

    /// DNS record cleanup or creation failed
    #[error("DNS publish error: {0}")]
    DnsPublish(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a session-expired error
    pub fn session_expired(msg: impl Into<String>) -> Self {
        Self::SessionExpired(msg.into())
    }

    /// Create a tunnel API error
    pub fn tunnel_api(code: i64, message: impl Into<String>) -> Self {
        Self::TunnelApi {
            code,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a DNS publish error
    pub fn dns_publish(msg: impl Into<String>) -> Self {
        Self::DnsPublish(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the session token is no longer valid
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_is_distinguished() {
        assert!(Error::session_expired("50014").is_session_expired());
        assert!(!Error::tunnel_api(40300, "denied").is_session_expired());
        assert!(!Error::transport("connection refused").is_session_expired());
    }

    #[test]
    fn tunnel_api_error_carries_code_and_message() {
        let err = Error::tunnel_api(40300, "forbidden");
        assert_eq!(err.to_string(), "tunnel API error (40300): forbidden");
    }
}
