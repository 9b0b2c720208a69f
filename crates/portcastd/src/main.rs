//! # portcastd — tunnel-to-DNS publishing daemon
//!
//! A thin integration layer: all publishing logic lives in
//! `portcast-core`. The daemon is responsible for
//!
//! 1. Reading configuration from environment variables
//! 2. Initializing tracing and the tokio runtime
//! 3. Constructing the tunnel source, DNS publisher and engine
//! 4. Running the engine until a fatal error or a shutdown signal
//!
//! ## Configuration
//!
//! All configuration is done via environment variables. Variables marked
//! with * also accept `<VAR>_FILE` pointing at a file holding the value.
//!
//! ### Published record
//! - `PORTCAST_DOMAIN`: domain the TXT record is published under
//! - `PORTCAST_RR`: host record label ("@" for the apex)
//!
//! ### Tunnel source (cpolar)
//! - `PORTCAST_SOURCE_URL`: base URL of the cpolar API
//! - `PORTCAST_SOURCE_USERNAME`*: account name
//! - `PORTCAST_SOURCE_PASSWORD`*: account password
//!
//! ### DNS publisher (Cloudflare)
//! - `PORTCAST_DNS_API_TOKEN`*: API token with Zone:DNS:Edit permission
//! - `PORTCAST_DNS_ZONE_ID`: zone ID (optional, resolved from the domain)
//! - `PORTCAST_DNS_TTL`: TTL of the published record in seconds (default 600)
//!
//! ### Engine
//! - `PORTCAST_POLL_INTERVAL_SECS`: sleep between poll cycles (default 3600)
//! - `PORTCAST_LOGIN_COOLDOWN_SECS`: pause after a failed login (default 3600)
//! - `PORTCAST_MODE`: "dry-run" performs lookups but skips DNS mutations
//! - `PORTCAST_LOG_LEVEL`: trace|debug|info|warn|error (default info)
//!
//! ## Example
//!
//! ```bash
//! export PORTCAST_DOMAIN=example.com
//! export PORTCAST_RR=tunnels
//! export PORTCAST_SOURCE_URL=http://localhost:9200
//! export PORTCAST_SOURCE_USERNAME=user@example.com
//! export PORTCAST_SOURCE_PASSWORD_FILE=/run/secrets/cpolar-password
//! export PORTCAST_DNS_API_TOKEN_FILE=/run/secrets/cloudflare-token
//!
//! portcastd
//! ```

mod env;

use std::process::ExitCode;

use anyhow::{Result, anyhow, bail};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use portcast_core::{PortcastConfig, PortcastEngine};
use portcast_dns_cloudflare::{CloudflareTxtPublisher, DEFAULT_TTL};
use portcast_source_cpolar::CpolarSource;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown (signal)
/// - 1: Configuration or startup error
/// - 2: Runtime error (fatal DNS publish failure)
#[derive(Debug, Clone, Copy)]
enum PortcastExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<PortcastExitCode> for ExitCode {
    fn from(code: PortcastExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    domain: String,
    record: String,
    source_url: String,
    source_username: String,
    source_password: String,
    dns_api_token: String,
    dns_zone_id: Option<String>,
    dns_ttl: u32,
    poll_interval_secs: Option<u64>,
    login_cooldown_secs: Option<u64>,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            domain: std::env::var("PORTCAST_DOMAIN").unwrap_or_default(),
            record: std::env::var("PORTCAST_RR").unwrap_or_default(),
            source_url: std::env::var("PORTCAST_SOURCE_URL").unwrap_or_default(),
            source_username: env::require_env_or_file("PORTCAST_SOURCE_USERNAME")?,
            source_password: env::require_env_or_file("PORTCAST_SOURCE_PASSWORD")?,
            dns_api_token: env::require_env_or_file("PORTCAST_DNS_API_TOKEN")?,
            dns_zone_id: std::env::var("PORTCAST_DNS_ZONE_ID").ok(),
            dns_ttl: parse_env("PORTCAST_DNS_TTL")?.unwrap_or(DEFAULT_TTL),
            poll_interval_secs: parse_env("PORTCAST_POLL_INTERVAL_SECS")?,
            login_cooldown_secs: parse_env("PORTCAST_LOGIN_COOLDOWN_SECS")?,
            dry_run: std::env::var("PORTCAST_MODE")
                .map(|mode| mode.eq_ignore_ascii_case("dry-run"))
                .unwrap_or(false),
            log_level: std::env::var("PORTCAST_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Covers presence, value formats, numeric ranges and the common
    /// placeholder mistakes; domain and record shape checks are delegated
    /// to [`PortcastConfig::validate`].
    fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            bail!("PORTCAST_DOMAIN is required. Set it via: export PORTCAST_DOMAIN=example.com");
        }

        if self.record.is_empty() {
            bail!("PORTCAST_RR is required. Set it via: export PORTCAST_RR=tunnels");
        }

        if self.source_url.is_empty() {
            bail!(
                "PORTCAST_SOURCE_URL is required. \
                Set it via: export PORTCAST_SOURCE_URL=http://localhost:9200"
            );
        }

        if !self.source_url.starts_with("https://") && !self.source_url.starts_with("http://") {
            bail!(
                "PORTCAST_SOURCE_URL must use an http or https scheme. Got: {}",
                self.source_url
            );
        }

        // Cloudflare API tokens are typically 40 characters; catch truncated
        // values and obvious placeholders before the first API call.
        if self.dns_api_token.len() < 20 {
            bail!(
                "PORTCAST_DNS_API_TOKEN appears too short ({} chars). \
                Verify your token is correct.",
                self.dns_api_token.len()
            );
        }

        let token_lower = self.dns_api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("example")
        {
            bail!(
                "PORTCAST_DNS_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        if self.dns_ttl == 0 || self.dns_ttl > 86400 {
            bail!(
                "PORTCAST_DNS_TTL must be between 1 and 86400 seconds. Got: {}",
                self.dns_ttl
            );
        }

        if let Some(interval) = self.poll_interval_secs
            && !(10..=86400).contains(&interval)
        {
            bail!(
                "PORTCAST_POLL_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {interval}"
            );
        }

        if let Some(cooldown) = self.login_cooldown_secs
            && !(10..=86400).contains(&cooldown)
        {
            bail!(
                "PORTCAST_LOGIN_COOLDOWN_SECS must be between 10 and 86400 seconds. Got: {cooldown}"
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => bail!(
                "PORTCAST_LOG_LEVEL '{other}' is not valid. \
                Valid levels: trace, debug, info, warn, error"
            ),
        }

        self.engine_config().validate()?;

        Ok(())
    }

    /// Engine configuration with the env-provided interval overrides
    fn engine_config(&self) -> PortcastConfig {
        let mut config = PortcastConfig::new(&self.domain, &self.record);
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval_secs = secs;
        }
        if let Some(secs) = self.login_cooldown_secs {
            config.login_cooldown_secs = secs;
        }
        config
    }
}

/// Parse an optional numeric environment variable
fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{name} is not a valid number: {e}")),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return PortcastExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("configuration validation error: {e}");
        return PortcastExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {e}");
        return PortcastExitCode::ConfigError.into();
    }

    info!("starting portcastd");
    info!(
        domain = %config.domain,
        record = %config.record,
        "publishing tunnel port mappings"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {e}");
            return PortcastExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("daemon error: {e}");
            PortcastExitCode::RuntimeError
        } else {
            PortcastExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Construct the collaborators and run the engine until a fatal error or a
/// shutdown signal
async fn run_daemon(config: Config) -> Result<()> {
    let source = CpolarSource::new(
        &config.source_url,
        &config.source_username,
        &config.source_password,
    )?;

    let publisher = CloudflareTxtPublisher::new(
        &config.dns_api_token,
        config.dns_zone_id.clone(),
        config.dns_ttl,
        config.dry_run,
    )?;

    if config.dry_run {
        warn!("running in dry-run mode, DNS records will not be modified");
    }

    let (mut engine, mut events) =
        PortcastEngine::new(Box::new(source), Box::new(publisher), config.engine_config())?;

    // The engine logs its own transitions; the event stream is surfaced at
    // debug level for external monitoring parity.
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!(?event, "engine event");
        }
    });

    tokio::select! {
        result = engine.run() => {
            // run() returns only on a fatal DNS publish failure
            result?;
            Ok(())
        }
        sig = wait_for_shutdown() => {
            info!("received {}, shutting down", sig?);
            Ok(())
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("failed to set up SIGTERM handler: {e}"))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("failed to set up SIGINT handler: {e}"))?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

/// Wait for a shutdown signal (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow!("failed to wait for CTRL-C: {e}"))?;
    Ok("SIGINT")
}
