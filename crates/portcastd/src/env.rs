//! Environment lookup with `_FILE` indirection
//!
//! Secrets can be provided directly (`PORTCAST_SOURCE_PASSWORD`) or through
//! a file path in a sibling variable (`PORTCAST_SOURCE_PASSWORD_FILE`), the
//! usual container-secret convention. The direct variable wins.

use std::fs;

use anyhow::{Context, Result};

/// Look up `name`, falling back to the contents of the file named by
/// `<name>_FILE`; file contents are trimmed
pub fn env_or_file(name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(name)
        && !value.is_empty()
    {
        return Some(value);
    }

    let path = std::env::var(format!("{name}_FILE")).ok()?;
    let contents = fs::read_to_string(path).ok()?;
    let trimmed = contents.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Like [`env_or_file`], but an error when neither yields a value
pub fn require_env_or_file(name: &str) -> Result<String> {
    env_or_file(name).with_context(|| format!("{name} (or {name}_FILE) must be set"))
}
