use bytes::{BufMut, BytesMut};

use crate::command::Command;
use crate::error::{Result, WireError};

/// Frame head marker: every frame starts with these 5 bytes.
pub const HEAD: [u8; 5] = [0x55, 0xAA, 0x5A, 0xA5, 0x7E];

/// Frame tail marker: every frame ends with these 2 bytes.
///
/// The protocol carries no length field; receivers delimit the stream on
/// this marker (see [`crate::buffer::StreamBuffer`]).
pub const TAIL: [u8; 2] = [0x00, 0x7E];

/// Default TCP port a relay listens on.
pub const DEFAULT_PORT: u16 = 8899;

/// Minimum wire size of a frame: head + sequence byte + tail.
pub const MIN_FRAME_SIZE: usize = HEAD.len() + 1 + TAIL.len();

/// Encode a complete frame into `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────┬────────────┬──────────┐
/// │ Head (5B)        │ Seq (1B) │ Body       │ Tail (2B)│
/// │ 55 aa 5a a5 7e   │          │ (variable) │ 00 7e    │
/// └──────────────────┴──────────┴────────────┴──────────┘
/// ```
///
/// The sequence byte comes from [`crate::state::ConnectionState`]; the codec
/// never advances it itself.
pub fn encode_frame(command: &Command, sequence: u8, dst: &mut BytesMut) {
    let body = command.body();
    dst.reserve(MIN_FRAME_SIZE + body.len());
    dst.put_slice(&HEAD);
    dst.put_u8(sequence);
    dst.put_slice(&body);
    dst.put_slice(&TAIL);
}

/// Strip head, sequence byte and tail from a raw frame, returning the body.
///
/// The body is what per-command response decoding operates on (see
/// [`crate::response`]).
pub fn frame_body(raw: &[u8]) -> Result<&[u8]> {
    if raw.len() < MIN_FRAME_SIZE {
        return Err(WireError::FrameTooShort {
            len: raw.len(),
            min: MIN_FRAME_SIZE,
        });
    }
    if raw[..HEAD.len()] != HEAD {
        return Err(WireError::InvalidHead);
    }
    if raw[raw.len() - TAIL.len()..] != TAIL {
        return Err(WireError::InvalidTail);
    }
    Ok(&raw[HEAD.len() + 1..raw.len() - TAIL.len()])
}
