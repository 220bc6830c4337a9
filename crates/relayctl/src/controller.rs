use bytes::{Bytes, BytesMut};
use relayctl_net::Session;
use relayctl_wire::{
    encode_frame, frame_body, Command, ConnectionState, NumberOfZones, StreamBuffer, ZoneInfo,
};
use tracing::debug;

use crate::error::Result;

/// Bytes requested from the session per read while reassembling a frame.
const READ_CHUNK: usize = 1024;

/// Composition point: binds a [`Session`], a [`ConnectionState`] and the
/// frame codec into a send-command / receive-response interface.
///
/// The controller advances the sequence number exactly once after each
/// transmitted frame and is the single writer of that state. The protocol
/// has no request/response correlation, so callers needing pairing must
/// send and then await the corresponding receive before sending again;
/// the typed query helpers below do exactly that.
pub struct Controller {
    session: Session,
    state: ConnectionState,
    buffer: StreamBuffer,
}

impl Controller {
    /// Wrap a session. The session may be connected or not; it opens
    /// lazily on first use.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: ConnectionState::new(),
            buffer: StreamBuffer::new(),
        }
    }

    /// Borrow the underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Start a new logical session: sequence number returns to 0 and any
    /// partially buffered response data is discarded.
    pub fn start_session(&mut self) {
        self.state.reset();
        self.buffer.reset();
    }

    /// Encode `command` with the current sequence byte and transmit it.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        let mut frame = BytesMut::new();
        encode_frame(command, self.state.current(), &mut frame);
        self.session.write(&frame).await?;
        // Exactly once per transmitted frame, after the successful write.
        self.state.advance();
        debug!(sequence = self.state.current(), ?command, "command sent");
        Ok(())
    }

    /// Receive one complete frame and return its stripped body.
    pub async fn receive(&mut self) -> Result<Bytes> {
        while !self.buffer.is_message_ready() {
            let chunk = self.session.read(READ_CHUNK).await?;
            self.buffer.feed(&chunk);
        }
        let message = self.buffer.get_message()?;
        let body = frame_body(&message)?;
        Ok(Bytes::copy_from_slice(body))
    }

    /// Ping the relay to surface a communication error early.
    pub async fn ping(&mut self) -> Result<()> {
        self.send(&Command::Ping).await
    }

    /// Power a zone on or off.
    pub async fn power_zone(&mut self, zone: u8, on: bool) -> Result<()> {
        self.send(&Command::power_zone(zone, on)?).await
    }

    /// Power all zones on or off.
    pub async fn master_power(&mut self, on: bool) -> Result<()> {
        self.send(&Command::master_power(on)).await
    }

    /// Set the brightness of a zone (1-255).
    pub async fn brightness(&mut self, zone: u8, level: u8) -> Result<()> {
        self.send(&Command::brightness(zone, level)?).await
    }

    /// Set the white temperature of a zone (0-255, higher = colder).
    pub async fn temperature(&mut self, zone: u8, level: u8) -> Result<()> {
        self.send(&Command::temperature(zone, level)?).await
    }

    /// Set RGBW channel values of a zone.
    pub async fn rgbw(&mut self, zone: u8, red: u8, green: u8, blue: u8, white: u8) -> Result<()> {
        self.send(&Command::rgbw(zone, red, green, blue, white)?).await
    }

    /// Query how many zones the relay has configured.
    pub async fn number_of_zones(&mut self) -> Result<NumberOfZones> {
        self.send(&Command::GetNumberOfZones).await?;
        let body = self.receive().await?;
        Ok(NumberOfZones::decode(&body)?)
    }

    /// Query the type and name of one zone.
    pub async fn zone_info(&mut self, zone: u8) -> Result<ZoneInfo> {
        self.send(&Command::get_zone_info(zone)?).await?;
        let body = self.receive().await?;
        Ok(ZoneInfo::decode(&body)?)
    }

    /// Close the underlying session.
    pub async fn close(&mut self) {
        self.session.close().await;
    }
}
