/// Rolling 1-byte frame sequence number for one logical session.
///
/// The relay uses it to detect stream position only; it is never echoed
/// back for request/response correlation. The sender advances it exactly
/// once after each successful transmission. No interior locking: the
/// caller must serialize access, and exactly one command should be in
/// flight per state at a time.
#[derive(Debug, Default)]
pub struct ConnectionState {
    frame_number: u8,
}

impl ConnectionState {
    /// Create a state starting at sequence number 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence byte to splice into the next frame.
    pub fn current(&self) -> u8 {
        self.frame_number
    }

    /// Advance after a successful transmission, wrapping 255 back to 0.
    pub fn advance(&mut self) {
        self.frame_number = self.frame_number.wrapping_add(1);
    }

    /// Restart at 0 for a new logical session.
    pub fn reset(&mut self) {
        self.frame_number = 0;
    }
}
