//! Async transports for lighting relay controllers.
//!
//! Two independent pieces:
//!
//! - [`Session`]: a persistent TCP session that owns one connection to a
//!   relay, serializes per-direction access, and transparently reconnects
//!   on transport failure.
//! - [`Discovery`]: the UDP broadcast/unicast protocol that resolves relay
//!   MAC addresses to their current IPv4 addresses.
//!
//! The byte payloads moving through a [`Session`] come from
//! `relayctl-wire`; this crate never interprets them.

pub mod discovery;
pub mod error;
pub mod session;

pub use discovery::{
    discover, format_mac, Discovery, DiscoveryOptions, DiscoveryResult, MacAddress, DISCOVERY_PORT,
};
pub use error::{DiscoveryError, SessionError};
pub use session::{Session, SessionConfig};
