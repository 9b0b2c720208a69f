//! Core traits for the portcast system
//!
//! This module defines the seams between the engine and its external
//! collaborators:
//!
//! - [`TunnelSource`]: authenticate to and poll the tunnel service
//! - [`DnsPublisher`]: replace the published TXT value

pub mod dns_publisher;
pub mod tunnel_source;

pub use dns_publisher::DnsPublisher;
pub use tunnel_source::{Tunnel, TunnelSource};
