//! Scripted test doubles for the engine contract tests
//!
//! Sources and publishers hand back pre-scripted outcomes; probe handles
//! share counters with the double after it moved into the engine, so tests
//! can assert on call counts and ordering after shutdown.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use portcast_core::config::PortcastConfig;
use portcast_core::error::{Error, Result};
use portcast_core::traits::{DnsPublisher, Tunnel, TunnelSource};

/// One scripted outcome for a login attempt
#[derive(Debug, Clone)]
pub enum LoginScript {
    Succeed,
    Fail,
}

/// One scripted outcome for a tunnel poll
#[derive(Debug, Clone)]
pub enum PollScript {
    Tunnels(Vec<Tunnel>),
    SessionExpired,
    Fail,
}

/// Counter handle for a [`ScriptedTunnelSource`]
#[derive(Debug, Clone, Default)]
pub struct SourceProbe {
    login_calls: Arc<AtomicUsize>,
    poll_calls: Arc<AtomicUsize>,
}

impl SourceProbe {
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

/// A tunnel source replaying scripted outcomes
///
/// Entries are consumed front to back; the last entry repeats forever, so a
/// script of `[SessionExpired, Tunnels(...)]` fails exactly once and then
/// keeps answering with the same listing.
pub struct ScriptedTunnelSource {
    login_script: Mutex<VecDeque<LoginScript>>,
    poll_script: Mutex<VecDeque<PollScript>>,
    probe: SourceProbe,
}

impl ScriptedTunnelSource {
    pub fn new(login: Vec<LoginScript>, poll: Vec<PollScript>) -> (Self, SourceProbe) {
        let probe = SourceProbe::default();
        let source = Self {
            login_script: Mutex::new(login.into()),
            poll_script: Mutex::new(poll.into()),
            probe: probe.clone(),
        };
        (source, probe)
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl TunnelSource for ScriptedTunnelSource {
    async fn login(&self) -> Result<()> {
        self.probe.login_calls.fetch_add(1, Ordering::SeqCst);
        match Self::next(&self.login_script) {
            Some(LoginScript::Fail) => Err(Error::auth("scripted login failure")),
            Some(LoginScript::Succeed) | None => Ok(()),
        }
    }

    async fn active_tunnels(&self) -> Result<Vec<Tunnel>> {
        self.probe.poll_calls.fetch_add(1, Ordering::SeqCst);
        match Self::next(&self.poll_script) {
            Some(PollScript::Tunnels(tunnels)) => Ok(tunnels),
            Some(PollScript::SessionExpired) => Err(Error::session_expired("scripted expiry")),
            Some(PollScript::Fail) => Err(Error::transport("scripted poll failure")),
            None => Ok(Vec::new()),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Counter and call-log handle for a [`MockDnsPublisher`]
#[derive(Debug, Clone, Default)]
pub struct PublisherProbe {
    clean_up_calls: Arc<AtomicUsize>,
    present_calls: Arc<AtomicUsize>,
    call_log: Arc<Mutex<Vec<&'static str>>>,
    published: Arc<Mutex<Vec<String>>>,
}

impl PublisherProbe {
    pub fn clean_up_calls(&self) -> usize {
        self.clean_up_calls.load(Ordering::SeqCst)
    }

    pub fn present_calls(&self) -> usize {
        self.present_calls.load(Ordering::SeqCst)
    }

    /// Operation names in invocation order
    pub fn call_log(&self) -> Vec<&'static str> {
        self.call_log.lock().unwrap().clone()
    }

    /// Values handed to `present`, in order
    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

/// A DNS publisher recording calls, optionally failing one operation
pub struct MockDnsPublisher {
    fail_clean_up: bool,
    fail_present: bool,
    probe: PublisherProbe,
}

impl MockDnsPublisher {
    pub fn new() -> (Self, PublisherProbe) {
        Self::build(false, false)
    }

    pub fn failing_clean_up() -> (Self, PublisherProbe) {
        Self::build(true, false)
    }

    pub fn failing_present() -> (Self, PublisherProbe) {
        Self::build(false, true)
    }

    fn build(fail_clean_up: bool, fail_present: bool) -> (Self, PublisherProbe) {
        let probe = PublisherProbe::default();
        let publisher = Self {
            fail_clean_up,
            fail_present,
            probe: probe.clone(),
        };
        (publisher, probe)
    }
}

#[async_trait]
impl DnsPublisher for MockDnsPublisher {
    async fn clean_up(&self, _domain: &str, _record: &str) -> Result<()> {
        self.probe.clean_up_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.call_log.lock().unwrap().push("clean_up");
        if self.fail_clean_up {
            Err(Error::dns_publish("scripted cleanup failure"))
        } else {
            Ok(())
        }
    }

    async fn present(&self, _domain: &str, _record: &str, value: &str) -> Result<()> {
        self.probe.present_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.call_log.lock().unwrap().push("present");
        self.probe.published.lock().unwrap().push(value.to_string());
        if self.fail_present {
            Err(Error::dns_publish("scripted present failure"))
        } else {
            Ok(())
        }
    }

    fn publisher_name(&self) -> &'static str {
        "mock"
    }
}

/// Configuration with zero-length intervals so contract tests spin through
/// many cycles inside a short wall-clock window
pub fn fast_config() -> PortcastConfig {
    let mut config = PortcastConfig::new("example.com", "tunnels");
    config.poll_interval_secs = 0;
    config.login_cooldown_secs = 0;
    config
}

/// The single-tunnel listing used across scenarios
pub fn sample_tunnels() -> Vec<Tunnel> {
    vec![Tunnel::new(
        "web",
        "tcp",
        "0.0.0.0:8080",
        "tcp://x.com:14783",
    )]
}
