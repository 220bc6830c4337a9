/// Errors surfaced by the TCP session layer.
///
/// Connection resets, aborts and broken pipes are handled internally by
/// close-and-retry and never appear here; what does appear is either a
/// non-retryable connect failure or retry-budget exhaustion.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to establish the TCP connection for a non-retryable reason.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// A non-retryable I/O error occurred on the connection.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured reconnect budget was exhausted.
    #[error("gave up after {attempts} reconnect attempts")]
    RetriesExhausted { attempts: usize },
}

/// Errors surfaced by the UDP discovery layer.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Failed to bind the UDP socket.
    #[error("failed to bind discovery socket: {0}")]
    Bind(std::io::Error),

    /// Failed to transmit the discovery request.
    #[error("failed to send discovery request: {0}")]
    Send(std::io::Error),

    /// `send_discovery_request` was called before `bind`.
    #[error("discovery socket is not bound yet; call bind() first")]
    NotBound,

    /// A reply datagram did not match `ip,machex,model`.
    #[error("malformed discovery reply: {reply:?}")]
    MalformedReply { reply: String },

    /// A reply carried a MAC field that is not 12 hex digits.
    #[error("malformed MAC address: {mac:?}")]
    MalformedMac { mac: String },
}
