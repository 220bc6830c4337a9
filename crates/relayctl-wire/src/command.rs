use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};

/// Opaque 7-byte constant prefixed to every command body.
///
/// Suspected to be a controller identifier, but the relay accepts it
/// hardcoded across deployments. Kept byte-for-byte as a fixed protocol
/// constant.
pub const COMMAND_MAGIC: [u8; 7] = [0x80, 0x00, 0x80, 0xE1, 0x80, 0x00, 0x00];

/// A zone number between 1 and 16.
///
/// Zones are addressed on the wire as a 16-bit little-endian bitmask with
/// bit `zone - 1` set, which is what limits the range to 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone(u8);

impl Zone {
    /// Validate and wrap a zone number.
    pub fn new(zone: u8) -> Result<Self> {
        if !(1..=16).contains(&zone) {
            return Err(WireError::ZoneOutOfRange { zone });
        }
        Ok(Self(zone))
    }

    /// The zone number (1-16).
    pub fn number(self) -> u8 {
        self.0
    }

    /// The wire bitmask: `1 << (zone - 1)`.
    pub fn mask(self) -> u16 {
        1 << (self.0 - 1)
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed command addressed to a relay.
///
/// Each variant encodes to a fixed-layout body via [`Command::body`]; the
/// surrounding frame (head, sequence byte, tail) is added by
/// [`crate::frame::encode_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// No-op command; useful to surface a communication error early.
    Ping,
    /// Power a single zone on or off.
    PowerZone { zone: Zone, on: bool },
    /// Power all zones on or off.
    MasterPower { on: bool },
    /// Set the brightness of a zone (1 = darkest, 255 = brightest).
    Brightness { zone: Zone, level: u8 },
    /// Set the white temperature of a zone (0 = warmest, 255 = coldest).
    Temperature { zone: Zone, level: u8 },
    /// Set RGBW channel values of a zone.
    Rgbw {
        zone: Zone,
        red: u8,
        green: u8,
        blue: u8,
        white: u8,
    },
    /// Ask the relay how many zones are configured.
    GetNumberOfZones,
    /// Ask the relay for the type and name of one zone.
    GetZoneInfo { zone: Zone },
}

impl Command {
    /// Build a [`Command::PowerZone`], validating the zone number.
    pub fn power_zone(zone: u8, on: bool) -> Result<Self> {
        Ok(Self::PowerZone {
            zone: Zone::new(zone)?,
            on,
        })
    }

    /// Build a [`Command::MasterPower`].
    pub fn master_power(on: bool) -> Self {
        Self::MasterPower { on }
    }

    /// Build a [`Command::Brightness`], validating zone and level.
    ///
    /// Level 0 is rejected; use [`Command::power_zone`] to switch off.
    pub fn brightness(zone: u8, level: u8) -> Result<Self> {
        if level == 0 {
            return Err(WireError::BrightnessOutOfRange { level });
        }
        Ok(Self::Brightness {
            zone: Zone::new(zone)?,
            level,
        })
    }

    /// Build a [`Command::Temperature`], validating the zone number.
    pub fn temperature(zone: u8, level: u8) -> Result<Self> {
        Ok(Self::Temperature {
            zone: Zone::new(zone)?,
            level,
        })
    }

    /// Build a [`Command::Rgbw`], validating the zone number and requiring
    /// at least one non-zero channel.
    pub fn rgbw(zone: u8, red: u8, green: u8, blue: u8, white: u8) -> Result<Self> {
        if red == 0 && green == 0 && blue == 0 && white == 0 {
            return Err(WireError::RgbwAllZero);
        }
        Ok(Self::Rgbw {
            zone: Zone::new(zone)?,
            red,
            green,
            blue,
            white,
        })
    }

    /// Build a [`Command::GetZoneInfo`], validating the zone number.
    pub fn get_zone_info(zone: u8) -> Result<Self> {
        Ok(Self::GetZoneInfo {
            zone: Zone::new(zone)?,
        })
    }

    /// Encode the command body (everything between the sequence byte and
    /// the tail).
    pub fn body(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(24);
        buf.put_slice(&COMMAND_MAGIC);
        match self {
            // Ping and the zone count query share the same body; the relay
            // answers both with a zone listing.
            Command::Ping | Command::GetNumberOfZones => {
                buf.put_slice(&[0x01, 0x00, 0x79, 0x00, 0x00]);
            }
            Command::PowerZone { zone, on } => {
                buf.put_u16_le(zone.mask());
                buf.put_slice(&[0x0A, 0x01, 0x00]);
                buf.put_u8(u8::from(*on));
            }
            Command::MasterPower { on } => {
                buf.put_slice(&[0x0F, 0xFF, 0x0B, 0x03, 0x00]);
                buf.put_u8(if *on { 0x03 } else { 0x00 });
                buf.put_u8(0x00);
                buf.put_u8(u8::from(*on));
            }
            Command::Brightness { zone, level } => {
                buf.put_u16_le(zone.mask());
                buf.put_slice(&[0x07, 0x02, 0x00, 0x00]);
                buf.put_u8(*level);
            }
            Command::Temperature { zone, level } => {
                buf.put_u16_le(zone.mask());
                buf.put_slice(&[0x0D, 0x02, 0x00, 0x00]);
                buf.put_u8(*level);
            }
            Command::Rgbw {
                zone,
                red,
                green,
                blue,
                white,
            } => {
                buf.put_u16_le(zone.mask());
                buf.put_slice(&[0x01, 0x07, 0x00]);
                buf.put_slice(&[*red, *green, *blue, *white]);
                buf.put_slice(&[0x00, 0x00, 0x00]);
            }
            Command::GetZoneInfo { zone } => {
                buf.put_u16_le(zone.mask());
                buf.put_slice(&[0x78, 0x00, 0x00]);
            }
        }
        buf
    }
}
