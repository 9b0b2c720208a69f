//! Configuration types for the portcast engine

use serde::{Deserialize, Serialize};

/// Engine configuration
///
/// Exactly one domain/record pair is managed per process. The intervals
/// default to one hour each: `poll_interval_secs` is the steady-state sleep
/// between tunnel polls, `login_cooldown_secs` the pause after a failed
/// login before the next attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortcastConfig {
    /// Domain the TXT record is published under (e.g. "example.com")
    pub domain: String,

    /// Host record label within the domain (e.g. "tunnels", or "@" for the
    /// apex)
    pub record: String,

    /// Steady-state sleep between poll cycles, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Cooldown after a failed login, in seconds
    #[serde(default = "default_login_cooldown_secs")]
    pub login_cooldown_secs: u64,

    /// Capacity of the engine event channel; events are dropped (with a
    /// warning) once it fills up
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl PortcastConfig {
    /// Create a configuration for the given domain/record pair with default
    /// intervals
    pub fn new(domain: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            record: record.into(),
            poll_interval_secs: default_poll_interval_secs(),
            login_cooldown_secs: default_login_cooldown_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_domain_name(&self.domain)?;
        validate_record_label(&self.record)?;

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// Validate that a string is a plausible DNS domain name
///
/// Basic RFC 1035 shape checks; not comprehensive, but catches the common
/// misconfigurations before the first API call.
fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("domain cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "domain too long: {} chars (max 253)",
            domain.len()
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "domain has an empty label: '{domain}'"
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "domain label too long: '{label}' ({} chars, max 63)",
                label.len()
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "domain label contains invalid characters: '{label}'"
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "domain label cannot start or end with a hyphen: '{label}'"
            )));
        }
    }

    Ok(())
}

/// Validate a host record label ("@" for the apex, otherwise one or more
/// dot-separated labels of alphanumerics, hyphens and underscores)
fn validate_record_label(record: &str) -> Result<(), crate::Error> {
    if record.is_empty() {
        return Err(crate::Error::config("record label cannot be empty"));
    }

    if record == "@" {
        return Ok(());
    }

    for label in record.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(crate::Error::config(format!(
                "invalid record label: '{record}'"
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::config(format!(
                "record label contains invalid characters: '{label}'"
            )));
        }
    }

    Ok(())
}

fn default_poll_interval_secs() -> u64 {
    3600
}

fn default_login_cooldown_secs() -> u64 {
    3600
}

fn default_event_channel_capacity() -> usize {
    64
}
