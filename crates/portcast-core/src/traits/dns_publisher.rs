//! DNS publisher trait
//!
//! Defines the interface for replacing the published TXT value under one
//! domain/record pair. Credential resolution and record TTL are
//! construction-time concerns of the implementation; the engine only needs
//! the two operations below.
//!
//! Publish cycles are non-transactional by design: the engine calls
//! [`clean_up`](DnsPublisher::clean_up) and then
//! [`present`](DnsPublisher::present), and treats a failure in either as
//! fatal. If deleting the Nth matching record fails, the earlier deletions
//! have already taken effect and are not rolled back.

use async_trait::async_trait;

/// Trait for DNS publisher implementations
///
/// Implementations must be stateless single-shot API clients: no retry, no
/// backoff, no caching. The engine owns scheduling, and a failed publish
/// terminates the process rather than leaving a partially applied DNS state
/// unreported.
#[async_trait]
pub trait DnsPublisher: Send + Sync {
    /// Delete every existing TXT record matching `record` under `domain`
    ///
    /// Succeeds when no matching records exist.
    async fn clean_up(&self, domain: &str, record: &str) -> Result<(), crate::Error>;

    /// Create a TXT record with the given value under `domain`/`record`
    async fn present(&self, domain: &str, record: &str, value: &str) -> Result<(), crate::Error>;

    /// Get the publisher name (for logging/debugging)
    fn publisher_name(&self) -> &'static str;
}
