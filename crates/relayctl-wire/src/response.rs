use bytes::Bytes;

use crate::error::{Result, WireError};

/// Size of the device header that prefixes every response body.
pub const DEVICE_HEADER_SIZE: usize = 12;

/// High bits identifying a normal device slot in a zone listing.
const NORMAL_DEVICE_BASE: u8 = 0x80;
const NORMAL_DEVICE_MASK: u8 = 0xE0;

/// Zone types as configured through the vendor application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneType {
    /// Can only be switched on/off.
    Switch = 0x01,
    /// Brightness can be adjusted.
    Dimmer = 0x11,
    /// Brightness and white temperature can be adjusted.
    Cct = 0x21,
    /// Brightness and RGB color can be adjusted.
    Rgb = 0x31,
    /// Brightness and RGBW color can be adjusted.
    Rgbw = 0x41,
    /// Brightness, RGBW color and white temperature can be adjusted.
    RgbCct = 0x51,
}

impl TryFrom<u8> for ZoneType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Switch),
            0x11 => Ok(Self::Dimmer),
            0x21 => Ok(Self::Cct),
            0x31 => Ok(Self::Rgb),
            0x41 => Ok(Self::Rgbw),
            0x51 => Ok(Self::RgbCct),
            value => Err(WireError::UnknownZoneType { value }),
        }
    }
}

/// Common header prefixed to every response body.
///
/// Layout (all multi-byte fields little-endian):
/// ```text
/// device_type(3B) | src_addr(2B) | dst_addr(2B) | zone_mask(2B)
///   | cmd_type(1B) | cmd_data_len(2B) | cmd_data
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHeader {
    pub device_type: [u8; 3],
    pub src_addr: u16,
    pub dst_addr: u16,
    pub zone_mask: u16,
    pub cmd_type: u8,
    /// Per-command payload, exactly `cmd_data_len` bytes.
    pub cmd_data: Bytes,
}

impl DeviceHeader {
    /// Parse the device header from a stripped frame body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.len() < DEVICE_HEADER_SIZE {
            return Err(WireError::HeaderTooShort {
                len: body.len(),
                min: DEVICE_HEADER_SIZE,
            });
        }
        let declared = u16::from_le_bytes([body[10], body[11]]) as usize;
        let available = body.len() - DEVICE_HEADER_SIZE;
        if declared > available {
            return Err(WireError::CommandDataTruncated {
                declared,
                available,
            });
        }
        Ok(Self {
            device_type: [body[0], body[1], body[2]],
            src_addr: u16::from_le_bytes([body[3], body[4]]),
            dst_addr: u16::from_le_bytes([body[5], body[6]]),
            zone_mask: u16::from_le_bytes([body[7], body[8]]),
            cmd_type: body[9],
            cmd_data: Bytes::copy_from_slice(
                &body[DEVICE_HEADER_SIZE..DEVICE_HEADER_SIZE + declared],
            ),
        })
    }
}

/// Zone listing reported in answer to [`crate::command::Command::GetNumberOfZones`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberOfZones {
    /// Ids of the configured zones, in the order the relay reports them.
    pub zones: Vec<u8>,
}

impl NumberOfZones {
    /// Decode a zone listing from a stripped frame body.
    ///
    /// Each command data byte describing a normal device carries the zone
    /// id in its low 5 bits; other bytes are padding.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let header = DeviceHeader::parse(body)?;
        let zones = header
            .cmd_data
            .iter()
            .filter(|byte| *byte & NORMAL_DEVICE_MASK == NORMAL_DEVICE_BASE)
            .map(|byte| byte & 0x1F)
            .collect();
        Ok(Self { zones })
    }

    /// Number of configured zones.
    pub fn count(&self) -> usize {
        self.zones.len()
    }
}

/// Type and name of a single zone, in answer to
/// [`crate::command::Command::GetZoneInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    pub zone_type: ZoneType,
    pub name: String,
}

impl ZoneInfo {
    /// Decode zone info from a stripped frame body.
    ///
    /// The name field is padded with spaces or NULs by the relay; trailing
    /// padding is trimmed. Invalid UTF-8 decodes with replacement.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let header = DeviceHeader::parse(body)?;
        if header.cmd_data.len() < 2 {
            return Err(WireError::ZoneInfoTooShort {
                len: header.cmd_data.len(),
            });
        }
        let zone_type = ZoneType::try_from(header.cmd_data[0])?;
        let name = String::from_utf8_lossy(&header.cmd_data[2..])
            .trim_end_matches([' ', '\0'])
            .to_string();
        Ok(Self { zone_type, name })
    }
}
