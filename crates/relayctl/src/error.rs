/// Errors that can occur in controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Protocol-level error: validation, framing or response decoding.
    #[error("wire error: {0}")]
    Wire(#[from] relayctl_wire::WireError),

    /// Transport-level error surfaced by the session.
    #[error("session error: {0}")]
    Session(#[from] relayctl_net::SessionError),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
