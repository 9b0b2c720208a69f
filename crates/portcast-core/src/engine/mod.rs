//! Core publication engine
//!
//! The `PortcastEngine` drives the whole poll → detect → publish cycle as an
//! explicit state machine on a single task:
//!
//! ```text
//!            login ok                    changed
//! LoggingIn ─────────► Polling ────────────────────► PublishPending
//!    ▲  ▲                │ │                              │
//!    │  │ login err      │ │ unchanged / poll err         │ publish ok
//!    │  └─(cooldown)     │ └──────────► Sleeping ◄────────┘
//!    │                   │                  │        publish err = fatal
//!    └───────────────────┘                  │ (poll interval)
//!        session expired                    ▼
//!                                        Polling
//! ```
//!
//! All network calls are sequential; the loop suspends only in the login
//! cooldown and the steady-state sleep. A DNS publish failure is the one
//! fatal path: `run` returns the error and the process is expected to exit,
//! since a partially applied DNS state must not be left unreported.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::PortcastConfig;
use crate::error::Result;
use crate::mapping::{PortMap, build_mapping};
use crate::state::ChangeDetector;
use crate::traits::{DnsPublisher, TunnelSource};

/// Events emitted by the engine for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine entered its loop
    Started,

    /// Login against the tunnel service failed; the engine cools down and
    /// retries
    LoginFailed {
        error: String,
    },

    /// The session token was reported expired; the engine re-logs-in
    SessionExpired,

    /// Polling the tunnel listing failed; the engine retries after the poll
    /// interval
    PollFailed {
        error: String,
    },

    /// A new port mapping differs from the last published one
    MappingChanged {
        mapping: PortMap,
    },

    /// The serialized mapping was written to DNS
    Published {
        domain: String,
        record: String,
        value: String,
    },

    /// DNS cleanup or creation failed; the engine terminates
    PublishFailed {
        error: String,
    },

    /// Engine left its loop
    Stopped {
        reason: String,
    },
}

/// Loop state; one transition is processed per iteration
enum EngineState {
    LoggingIn,
    Polling,
    PublishPending { payload: String },
    Sleeping,
}

/// The polling state machine bridging a [`TunnelSource`] to a
/// [`DnsPublisher`]
///
/// ## Lifecycle
///
/// 1. Create with [`PortcastEngine::new()`] (validates the configuration)
/// 2. Drive with [`PortcastEngine::run()`]
/// 3. `run` returns only on a fatal DNS publish failure (or, in tests, on a
///    shutdown signal)
///
/// ## Threading
///
/// The engine owns the change detector and drives all collaborators from a
/// single task; no synchronization is involved.
pub struct PortcastEngine {
    /// Tunnel service client
    source: Box<dyn TunnelSource>,

    /// DNS publisher for the TXT record
    publisher: Box<dyn DnsPublisher>,

    /// Last-published mapping state
    detector: ChangeDetector,

    /// Domain the TXT record lives under
    domain: String,

    /// Host record label
    record: String,

    /// Steady-state sleep between poll cycles
    poll_interval: Duration,

    /// Pause after a failed login
    login_cooldown: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl PortcastEngine {
    /// Create a new engine
    ///
    /// Returns the engine and a receiver yielding [`EngineEvent`]s. The
    /// receiver may be dropped if events are not of interest.
    pub fn new(
        source: Box<dyn TunnelSource>,
        publisher: Box<dyn DnsPublisher>,
        config: PortcastConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            source,
            publisher,
            detector: ChangeDetector::new(),
            domain: config.domain,
            record: config.record,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            login_cooldown: Duration::from_secs(config.login_cooldown_secs),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine until a fatal error
    ///
    /// Transient failures (login, polling) are reported and retried
    /// indefinitely; only a DNS publish failure makes this return.
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Test-only entry point accepting a controlled shutdown signal
    ///
    /// Production code should use [`run`](PortcastEngine::run); process
    /// lifetime is managed by the daemon, not by the engine.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let mut shutdown = shutdown_rx;
        let mut state = EngineState::LoggingIn;

        info!(
            source = self.source.source_name(),
            publisher = self.publisher.publisher_name(),
            domain = %self.domain,
            record = %self.record,
            "engine started"
        );
        self.emit_event(EngineEvent::Started);

        loop {
            state = match state {
                EngineState::LoggingIn => match self.source.login().await {
                    Ok(()) => {
                        info!("logged in to tunnel service");
                        EngineState::Polling
                    }
                    Err(e) => {
                        warn!("login failed: {e}");
                        self.emit_event(EngineEvent::LoginFailed {
                            error: e.to_string(),
                        });
                        if !self.pause(self.login_cooldown, &mut shutdown).await {
                            return self.stop("shutdown signal");
                        }
                        EngineState::LoggingIn
                    }
                },

                EngineState::Polling => match self.source.active_tunnels().await {
                    Ok(tunnels) => {
                        debug!(count = tunnels.len(), "polled active tunnels");
                        if self.detector.update(build_mapping(&tunnels)) {
                            let payload = self.detector.marshal()?;
                            info!(%payload, "port mapping changed");
                            self.emit_event(EngineEvent::MappingChanged {
                                mapping: self.detector.current().clone(),
                            });
                            EngineState::PublishPending { payload }
                        } else {
                            debug!("port mapping unchanged");
                            EngineState::Sleeping
                        }
                    }
                    Err(e) if e.is_session_expired() => {
                        warn!("session expired, logging in again: {e}");
                        self.emit_event(EngineEvent::SessionExpired);
                        EngineState::LoggingIn
                    }
                    Err(e) => {
                        warn!("tunnel poll failed: {e}");
                        self.emit_event(EngineEvent::PollFailed {
                            error: e.to_string(),
                        });
                        EngineState::Sleeping
                    }
                },

                EngineState::PublishPending { payload } => {
                    if let Err(e) = self.publish(&payload).await {
                        error!("DNS publish failed: {e}");
                        self.emit_event(EngineEvent::PublishFailed {
                            error: e.to_string(),
                        });
                        return Err(e);
                    }
                    // Process output contract: the serialized mapping and a
                    // literal success marker go to stdout, independent of the
                    // tracing configuration.
                    println!("{payload}");
                    println!("success");
                    self.emit_event(EngineEvent::Published {
                        domain: self.domain.clone(),
                        record: self.record.clone(),
                        value: payload,
                    });
                    EngineState::Sleeping
                }

                EngineState::Sleeping => {
                    if !self.pause(self.poll_interval, &mut shutdown).await {
                        return self.stop("shutdown signal");
                    }
                    EngineState::Polling
                }
            };
        }
    }

    /// Remove the previously published records, then create the new value.
    /// Strictly sequential; `clean_up` completes before `present` begins.
    async fn publish(&self, payload: &str) -> Result<()> {
        info!(
            publisher = self.publisher.publisher_name(),
            domain = %self.domain,
            record = %self.record,
            "republishing TXT record"
        );
        self.publisher.clean_up(&self.domain, &self.record).await?;
        self.publisher
            .present(&self.domain, &self.record, payload)
            .await?;
        Ok(())
    }

    /// Sleep for `duration`; returns `false` when a shutdown signal arrived
    /// instead
    async fn pause(
        &self,
        duration: Duration,
        shutdown: &mut Option<oneshot::Receiver<()>>,
    ) -> bool {
        match shutdown.as_mut() {
            Some(rx) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => true,
                    _ = rx => false,
                }
            }
            None => {
                tokio::time::sleep(duration).await;
                true
            }
        }
    }

    fn stop(&self, reason: &str) -> Result<()> {
        info!("engine stopped: {reason}");
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Emit an engine event; dropped with a warning when the channel is
    /// full, silently when the receiver is gone
    fn emit_event(&self, event: EngineEvent) {
        use tokio::sync::mpsc::error::TrySendError;

        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("event channel full, dropping engine event");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
