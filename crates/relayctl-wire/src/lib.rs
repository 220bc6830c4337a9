//! Pure wire protocol for lighting relay controllers.
//!
//! Everything in this crate is I/O-free: typed commands encode to fixed
//! byte layouts, responses decode from stripped frame bodies, and the
//! stream buffer delimits a chunked byte stream on the fixed 2-byte tail.
//! Frames look like:
//!
//! ```text
//! 55 aa 5a a5 7e | seq (1B) | body | 00 7e
//! ```
//!
//! The transport layers live in `relayctl-net`; composition lives in
//! `relayctl`.

pub mod buffer;
pub mod command;
pub mod error;
pub mod frame;
pub mod response;
pub mod state;

pub use buffer::StreamBuffer;
pub use command::{Command, Zone, COMMAND_MAGIC};
pub use error::{Result, WireError};
pub use frame::{encode_frame, frame_body, DEFAULT_PORT, HEAD, MIN_FRAME_SIZE, TAIL};
pub use response::{DeviceHeader, NumberOfZones, ZoneInfo, ZoneType, DEVICE_HEADER_SIZE};
pub use state::ConnectionState;
