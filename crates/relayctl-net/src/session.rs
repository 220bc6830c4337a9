use std::io::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SessionError;

type Result<T> = std::result::Result<T, SessionError>;

/// Reconnect policy for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum close-and-retry attempts per operation. `None` retries
    /// forever, which matches what the relay firmware expects from a
    /// persistent client; bound it when permanent network loss must
    /// surface as an error instead of a hang.
    pub max_retries: Option<usize>,
    /// Delay between reconnect attempts.
    pub retry_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            retry_backoff: Duration::ZERO,
        }
    }
}

/// One TCP connection, split per direction.
///
/// The generation number lets a failing operation invalidate exactly the
/// connection it observed failing: a read-triggered reconnect can never
/// tear down a newer connection the write path just opened.
struct Conn {
    generation: u64,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
}

/// A persistent session over a single TCP connection to a relay.
///
/// The connection is opened lazily on first use. Writes are serialized
/// against writes and reads against reads, while a read and a write may
/// proceed concurrently. On connection reset, abort, broken pipe or EOF
/// the session closes the connection and retries the same operation
/// according to its [`SessionConfig`].
///
/// For deterministic cleanup call [`Session::close`]; dropping the
/// session also closes the socket.
pub struct Session {
    host: String,
    port: u16,
    config: SessionConfig,
    conn: StdMutex<Option<Arc<Conn>>>,
    next_generation: AtomicU64,
    write_lock: Mutex<()>,
    read_lock: Mutex<()>,
}

impl Session {
    /// Create a session for `(host, port)` with the default config.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(host, port, SessionConfig::default())
    }

    /// Create a session for a relay on its default port (8899).
    pub fn for_relay(host: impl Into<String>) -> Self {
        Self::new(host, relayctl_wire::DEFAULT_PORT)
    }

    /// Create a session with an explicit reconnect policy.
    pub fn with_config(host: impl Into<String>, port: u16, config: SessionConfig) -> Self {
        Self {
            host: host.into(),
            port,
            config,
            conn: StdMutex::new(None),
            next_generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            read_lock: Mutex::new(()),
        }
    }

    /// Eagerly establish the connection so the first write is not slowed
    /// down by the connect.
    pub async fn open(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    /// Write all of `data` to the relay, reconnecting and retrying on
    /// transport failure.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut attempts = 0usize;
        loop {
            let conn = match self.connection().await {
                Ok(conn) => conn,
                Err(err) if err_is_retryable(&err) => {
                    self.note_retry(&mut attempts).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };
            let result = async {
                let mut writer = conn.writer.lock().await;
                writer.write_all(data).await?;
                writer.flush().await
            }
            .await;
            match result {
                Ok(()) => {
                    debug!(data = %hex(data), "sent");
                    return Ok(());
                }
                Err(err) if is_retryable(err.kind()) => {
                    warn!(error = %err, "write failed, reconnecting");
                    self.invalidate(&conn).await;
                    self.note_retry(&mut attempts).await?;
                }
                Err(err) => return Err(SessionError::Io(err)),
            }
        }
    }

    /// Read up to `max` bytes from the relay, reconnecting and retrying on
    /// transport failure. EOF counts as a transport failure: a relay that
    /// closed the connection is expected to accept a new one.
    pub async fn read(&self, max: usize) -> Result<Bytes> {
        let _guard = self.read_lock.lock().await;
        let mut attempts = 0usize;
        let mut buf = vec![0u8; max];
        loop {
            let conn = match self.connection().await {
                Ok(conn) => conn,
                Err(err) if err_is_retryable(&err) => {
                    self.note_retry(&mut attempts).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };
            let result = {
                let mut reader = conn.reader.lock().await;
                reader.read(&mut buf).await
            };
            match result {
                Ok(0) => {
                    warn!("connection closed by peer, reconnecting");
                    self.invalidate(&conn).await;
                    self.note_retry(&mut attempts).await?;
                }
                Ok(n) => {
                    debug!(data = %hex(&buf[..n]), "received");
                    buf.truncate(n);
                    return Ok(Bytes::from(buf));
                }
                Err(err) if is_retryable(err.kind()) => {
                    warn!(error = %err, "read failed, reconnecting");
                    self.invalidate(&conn).await;
                    self.note_retry(&mut attempts).await?;
                }
                Err(err) => return Err(SessionError::Io(err)),
            }
        }
    }

    /// Close the connection. Idempotent; closing an unopened session is a
    /// no-op. The next operation reconnects lazily.
    pub async fn close(&self) {
        let conn = self.conn.lock().expect("connection slot poisoned").take();
        if let Some(conn) = conn {
            debug!(host = %self.host, port = self.port, "closing connection");
            let mut writer = conn.writer.lock().await;
            // Best effort; dropping the halves closes the socket anyway.
            let _ = writer.shutdown().await;
        }
    }

    /// Get the current connection, opening one if none exists.
    async fn connection(&self) -> Result<Arc<Conn>> {
        if let Some(conn) = self.conn.lock().expect("connection slot poisoned").clone() {
            return Ok(conn);
        }
        debug!(host = %self.host, port = self.port, "opening connection");
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| SessionError::Connect {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        let (reader, writer) = stream.into_split();
        let conn = Arc::new(Conn {
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        });
        let mut slot = self.conn.lock().expect("connection slot poisoned");
        match &*slot {
            // The other direction connected first while we were; use that
            // connection and let ours drop closed.
            Some(existing) => Ok(Arc::clone(existing)),
            None => {
                *slot = Some(Arc::clone(&conn));
                Ok(conn)
            }
        }
    }

    /// Drop `stale` from the connection slot unless a newer connection
    /// already replaced it.
    async fn invalidate(&self, stale: &Arc<Conn>) {
        let taken = {
            let mut slot = self.conn.lock().expect("connection slot poisoned");
            match &*slot {
                Some(current) if current.generation == stale.generation => slot.take(),
                _ => None,
            }
        };
        if let Some(conn) = taken {
            let mut writer = conn.writer.lock().await;
            let _ = writer.shutdown().await;
        }
    }

    /// Account for one failed attempt, honoring the retry budget and
    /// backoff.
    async fn note_retry(&self, attempts: &mut usize) -> Result<()> {
        *attempts += 1;
        if let Some(max) = self.config.max_retries {
            if *attempts > max {
                return Err(SessionError::RetriesExhausted {
                    attempts: *attempts,
                });
            }
        }
        if !self.config.retry_backoff.is_zero() {
            tokio::time::sleep(self.config.retry_backoff).await;
        }
        Ok(())
    }
}

/// Transport failures that are handled by close-and-retry.
fn is_retryable(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}

fn err_is_retryable(err: &SessionError) -> bool {
    match err {
        SessionError::Connect { source, .. } => is_retryable(source.kind()),
        _ => false,
    }
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    async fn listen() -> (TcpListener, String, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr.ip().to_string(), addr.port())
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let (listener, host, port) = listen().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"ping");
            stream.write_all(b"pong").await.unwrap();
        });

        let session = Session::new(host, port);
        session.write(b"ping").await.unwrap();
        let response = session.read(64).await.unwrap();
        assert_eq!(response.as_ref(), b"pong");

        session.close().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_is_lazy_and_shared_between_directions() {
        let (listener, host, port) = listen().await;
        let server = tokio::spawn(async move {
            // Exactly one connection must arrive for a write + read pair.
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(b"ok").await.unwrap();
            // A second accept would hang; ending here proves one was enough.
        });

        let session = Session::new(host, port);
        session.open().await.unwrap();
        session.write(b"hi").await.unwrap();
        assert_eq!(session.read(16).await.unwrap().as_ref(), b"ok");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn read_reconnects_after_peer_close() {
        let (listener, host, port) = listen().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream); // relay drops the idle connection
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"hello").await.unwrap();
            stream
        });

        let session = Session::new(host, port);
        let response = session.read(64).await.unwrap();
        assert_eq!(response.as_ref(), b"hello");
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_surfaces() {
        let (listener, host, port) = listen().await;
        let server = tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                drop(stream);
            }
        });

        let session = Session::with_config(
            host,
            port,
            SessionConfig {
                max_retries: Some(2),
                retry_backoff: Duration::ZERO,
            },
        );
        let err = session.read(64).await.unwrap_err();
        assert!(matches!(err, SessionError::RetriesExhausted { .. }));
        server.abort();
    }

    #[tokio::test]
    async fn refused_connect_is_not_retried() {
        let (listener, host, port) = listen().await;
        drop(listener);

        let session = Session::new(host, port);
        let err = session.read(64).await.unwrap_err();
        assert!(matches!(err, SessionError::Connect { .. }));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_noop_when_unopened() {
        let (_listener, host, port) = listen().await;
        let session = Session::new(host, port);
        session.close().await;
        session.close().await;
    }
}
