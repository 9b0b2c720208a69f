//! Published-state tracking
//!
//! The [`ChangeDetector`] holds the last port mapping handed to it and
//! reports whether a fresh snapshot requires a republish. The state lives
//! only in memory: a restart starts from an empty mapping, which compares
//! unequal to any non-empty snapshot and therefore forces one republish.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::mapping::PortMap;

/// Detects changes between the current and the last observed port mapping
///
/// `update` replaces the stored mapping unconditionally, so a cycle whose
/// publish step later fails still consumes the change; the mapping is not
/// re-published until it changes again.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    current: PortMap,
    last_changed_at: Option<DateTime<Utc>>,
}

impl ChangeDetector {
    /// Create a detector with an empty initial mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `new_mapping` against the stored one, then store it
    ///
    /// Returns `true` iff the key/value pair sets differ.
    pub fn update(&mut self, new_mapping: PortMap) -> bool {
        let changed = new_mapping != self.current;
        self.current = new_mapping;
        if changed {
            self.last_changed_at = Some(Utc::now());
        }
        changed
    }

    /// The currently stored mapping
    pub fn current(&self) -> &PortMap {
        &self.current
    }

    /// When the stored mapping last changed, if it ever has
    pub fn last_changed_at(&self) -> Option<DateTime<Utc>> {
        self.last_changed_at
    }

    /// Serialize the stored mapping as a key-sorted JSON object
    ///
    /// Cannot fail for a string-to-string mapping; the error path only
    /// satisfies the serializer signature.
    pub fn marshal(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.current)?)
    }
}
