/// Errors raised by the pure protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The zone number is outside the addressable bitmask range.
    #[error("zone number must be between 1 and 16 (got {zone})")]
    ZoneOutOfRange { zone: u8 },

    /// Brightness level 0 is not a valid dimming target.
    #[error("brightness level must be between 1 and 255 (got {level})")]
    BrightnessOutOfRange { level: u8 },

    /// An RGBW command with all channels at zero is rejected by the relay.
    #[error("RGBW command requires at least one non-zero channel")]
    RgbwAllZero,

    /// The raw frame is shorter than head + sequence byte + tail.
    #[error("frame too short ({len} bytes, minimum {min})")]
    FrameTooShort { len: usize, min: usize },

    /// The frame does not start with the fixed head marker.
    #[error("invalid frame head (expected 55 aa 5a a5 7e)")]
    InvalidHead,

    /// The frame does not end with the fixed tail marker.
    #[error("invalid frame tail (expected 00 7e)")]
    InvalidTail,

    /// The response body is too short to contain a device header.
    #[error("response body too short ({len} bytes, device header needs {min})")]
    HeaderTooShort { len: usize, min: usize },

    /// The declared command data length exceeds the bytes actually present.
    #[error("command data truncated (declared {declared} bytes, {available} available)")]
    CommandDataTruncated { declared: usize, available: usize },

    /// The zone info payload is too short to carry a type byte and name.
    #[error("zone info data too short ({len} bytes, need at least 2)")]
    ZoneInfoTooShort { len: usize },

    /// The zone type byte does not match any known zone type.
    #[error("unrecognized zone type byte 0x{value:02x}")]
    UnknownZoneType { value: u8 },

    /// `get_message` was called before a complete message was buffered.
    #[error("no complete message is buffered yet")]
    IncompleteMessage,
}

pub type Result<T> = std::result::Result<T, WireError>;
