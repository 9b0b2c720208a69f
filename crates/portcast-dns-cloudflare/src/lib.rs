//! Cloudflare TXT publisher
//!
//! Implements [`DnsPublisher`] against the Cloudflare API v4. The publisher
//! owns the two record operations the engine needs and nothing else:
//!
//! - `clean_up`: list every TXT record matching the managed label
//!   (`GET /zones/:zone/dns_records?type=TXT&name=...`) and delete each
//! - `present`: create a TXT record holding the serialized mapping
//!   (`POST /zones/:zone/dns_records`)
//!
//! The zone ID is either pre-configured or resolved once per call via
//! `GET /zones?name={domain}` — the managed domain is the zone. All
//! failures surface as [`Error::DnsPublish`]; the engine treats them as
//! fatal, so there is no retry or backoff here.
//!
//! # Dry-run mode
//!
//! With `dry_run` set, the publisher performs all lookups but logs intended
//! deletions and creations instead of executing them.
//!
//! # Security
//!
//! The API token never appears in logs; the `Debug` implementation redacts
//! it.

use std::time::Duration;

use async_trait::async_trait;
use portcast_core::error::{Error, Result};
use portcast_core::traits::DnsPublisher;
use reqwest::StatusCode;
use serde_json::Value;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TTL for published TXT records, in seconds
pub const DEFAULT_TTL: u32 = 600;

/// TXT publisher for a single Cloudflare zone
pub struct CloudflareTxtPublisher {
    /// Cloudflare API token with Zone:DNS:Edit permission
    /// ⚠️ never log this value
    api_token: String,

    /// Zone ID; resolved from the domain name when not pre-configured
    zone_id: Option<String>,

    /// TTL applied to created records, in seconds
    ttl: u32,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// When set, log intended mutations instead of performing them
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareTxtPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareTxtPublisher")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("ttl", &self.ttl)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareTxtPublisher {
    /// Create a new publisher
    ///
    /// Fails with a configuration error on an empty token or a zero TTL.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        ttl: u32,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if ttl == 0 {
            return Err(Error::config("TXT record TTL must be > 0"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            zone_id,
            ttl,
            client,
            dry_run,
        })
    }

    /// Zone ID for the managed domain: pre-configured, or looked up by name
    async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        if let Some(zone_id) = &self.zone_id {
            return Ok(zone_id.clone());
        }

        let url = format!("{CLOUDFLARE_API_BASE}/zones?name={domain}");
        let json = self.get_json(&url, "zone lookup").await?;

        let zone_id = json["result"]
            .as_array()
            .and_then(|zones| zones.first())
            .and_then(|zone| zone["id"].as_str())
            .ok_or_else(|| Error::dns_publish(format!("zone not found: {domain}")))?;

        tracing::debug!(%domain, zone = %zone_id, "resolved zone ID");
        Ok(zone_id.to_string())
    }

    /// IDs of all TXT records matching the managed name
    async fn find_txt_record_ids(&self, zone_id: &str, name: &str) -> Result<Vec<String>> {
        let url = format!(
            "{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records?type=TXT&name={name}&per_page=100"
        );
        let json = self.get_json(&url, "record lookup").await?;

        let records = json["result"]
            .as_array()
            .ok_or_else(|| Error::dns_publish("record lookup: result is not an array"))?;

        Ok(records
            .iter()
            .filter_map(|record| record["id"].as_str().map(str::to_string))
            .collect())
    }

    async fn get_json(&self, url: &str, context: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::dns_publish(format!("{context}: request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(context, status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::dns_publish(format!("{context}: undecodable response: {e}")))
    }
}

#[async_trait]
impl DnsPublisher for CloudflareTxtPublisher {
    async fn clean_up(&self, domain: &str, record: &str) -> Result<()> {
        let zone_id = self.resolve_zone_id(domain).await?;
        let name = fqdn(record, domain);

        let record_ids = self.find_txt_record_ids(&zone_id, &name).await?;
        tracing::info!(
            record = %name,
            matching = record_ids.len(),
            "removing previously published TXT records"
        );

        for record_id in record_ids {
            if self.dry_run {
                tracing::info!(%record_id, "[dry-run] would delete TXT record");
                continue;
            }

            let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records/{record_id}");
            let response = self
                .client
                .delete(&url)
                .bearer_auth(&self.api_token)
                .send()
                .await
                .map_err(|e| Error::dns_publish(format!("record deletion: request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                // Earlier deletions have already taken effect and are not
                // rolled back.
                let body = response.text().await.unwrap_or_default();
                return Err(api_error("record deletion", status, &body));
            }
        }

        Ok(())
    }

    async fn present(&self, domain: &str, record: &str, value: &str) -> Result<()> {
        let zone_id = self.resolve_zone_id(domain).await?;
        let name = fqdn(record, domain);

        let payload = serde_json::json!({
            "type": "TXT",
            "name": name,
            "content": value,
            "ttl": self.ttl,
        });

        if self.dry_run {
            tracing::info!(record = %name, %payload, "[dry-run] would create TXT record");
            return Ok(());
        }

        let url = format!("{CLOUDFLARE_API_BASE}/zones/{zone_id}/dns_records");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::dns_publish(format!("record creation: request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error("record creation", status, &body));
        }

        tracing::info!(record = %name, ttl = self.ttl, "TXT record created");
        Ok(())
    }

    fn publisher_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Fully qualified record name; `@` addresses the zone apex
fn fqdn(record: &str, domain: &str) -> String {
    if record == "@" {
        domain.to_string()
    } else {
        format!("{record}.{domain}")
    }
}

/// Map a non-success HTTP status to a publish error
fn api_error(context: &str, status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::dns_publish(format!(
            "{context}: authentication rejected ({status}), check the API token and its permissions"
        )),
        404 => Error::dns_publish(format!("{context}: not found ({status})")),
        429 => Error::dns_publish(format!("{context}: rate limited ({status})")),
        500..=599 => Error::dns_publish(format!(
            "{context}: Cloudflare server error ({status}): {body}"
        )),
        _ => Error::dns_publish(format!("{context}: unexpected status {status}: {body}")),
    }
}
