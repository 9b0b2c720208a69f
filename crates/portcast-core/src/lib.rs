//! # portcast-core
//!
//! Core library for the portcast tunnel-to-DNS publisher.
//!
//! Portcast watches a dynamic tunneling service that exposes local ports on
//! rotating public addresses and mirrors the resulting port-mapping table
//! into a single DNS TXT record. This crate holds everything except the
//! provider-specific HTTP plumbing:
//!
//! - **Mapping**: derive a canonical source-port → destination-port table
//!   from a tunnel listing ([`mapping`])
//! - **State**: detect whether the table differs from the last published one
//!   ([`state::ChangeDetector`])
//! - **Traits**: the [`TunnelSource`] and [`DnsPublisher`] seams that
//!   concrete clients implement
//! - **Engine**: the polling state machine driving login → poll → detect →
//!   publish ([`engine::PortcastEngine`])
//!
//! ## Design notes
//!
//! The engine is a single logical thread of control. There are no parallel
//! workers and no shared mutable state; the last-published table and the
//! session token are owned by the one loop. Republishing is all-or-nothing
//! per cycle: the old TXT records are removed, then the new value is
//! created, and a failure in either step is fatal to the process.

pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod state;
pub mod traits;

pub use config::PortcastConfig;
pub use engine::{EngineEvent, PortcastEngine};
pub use error::{Error, Result};
pub use mapping::{PortMap, build_mapping, extract_port};
pub use state::ChangeDetector;
pub use traits::{DnsPublisher, Tunnel, TunnelSource};
