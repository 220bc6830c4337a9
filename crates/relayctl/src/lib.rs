//! Protocol engine for lighting relay controllers.
//!
//! Talks the relay's proprietary binary TCP protocol (fixed head, 1-byte
//! rolling sequence number, fixed 2-byte tail) and its companion UDP
//! discovery protocol that maps relay MAC addresses to IPv4 addresses.
//!
//! # Crate Structure
//!
//! - [`wire`] — Frame codec, typed commands/responses, stream buffer
//! - [`net`] — Reconnecting TCP session and UDP discovery
//! - [`Controller`] — Composition point binding the two together
//!
//! # Example
//!
//! ```no_run
//! use relayctl::{Controller, Session};
//!
//! # async fn demo() -> Result<(), relayctl::ControllerError> {
//! let mut controller = Controller::new(Session::for_relay("192.168.1.5"));
//! let zones = controller.number_of_zones().await?;
//! for zone in &zones.zones {
//!     let info = controller.zone_info(*zone).await?;
//!     println!("zone {zone}: {:?} {:?}", info.zone_type, info.name);
//! }
//! controller.power_zone(2, true).await?;
//! controller.close().await;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod error;

/// Re-export wire protocol types.
pub mod wire {
    pub use relayctl_wire::*;
}

/// Re-export transport types.
pub mod net {
    pub use relayctl_net::*;
}

pub use controller::Controller;
pub use error::{ControllerError, Result};
pub use relayctl_net::{discover, Discovery, DiscoveryOptions, Session, SessionConfig};
pub use relayctl_wire::{Command, ConnectionState, NumberOfZones, StreamBuffer, Zone, ZoneInfo, ZoneType};
