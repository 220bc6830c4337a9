use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DiscoveryError;

type Result<T> = std::result::Result<T, DiscoveryError>;

/// UDP port relays answer discovery requests on.
pub const DISCOVERY_PORT: u16 = 48899;

/// Fixed request token understood by the relay's network chip.
const DISCOVERY_REQUEST: &[u8] = b"HF-A11ASSISTHREAD";

/// MAC address of a relay's network chip.
pub type MacAddress = [u8; 6];

/// Accumulated discovery table: MAC address to the set of IPv4 addresses
/// replies were observed from. A relay answering from several addresses
/// (e.g. Wi-Fi and Ethernet) maps to several IPs.
pub type DiscoveryResult = HashMap<MacAddress, BTreeSet<Ipv4Addr>>;

/// Tuning knobs for [`discover`].
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Whether `target` is a subnet broadcast address (enables
    /// `SO_BROADCAST` on the socket).
    pub broadcast: bool,
    /// How many times to send the discovery request.
    pub retry: usize,
    /// Sleep between requests, also used as the trailing grace period for
    /// late replies.
    pub interval: Duration,
    /// Destination port; the protocol fixes this to 48899, overridable for
    /// tests.
    pub port: u16,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            broadcast: false,
            retry: 3,
            interval: Duration::from_secs(1),
            port: DISCOVERY_PORT,
        }
    }
}

/// UDP discovery protocol: request relays to report their MAC address.
///
/// Replies arrive asynchronously on a background receive task and are
/// merged into a shared table keyed by MAC. The IP recorded is the
/// datagram's source address, not the address embedded in the reply
/// (devices behind NAT report stale addresses).
pub struct Discovery {
    target: SocketAddrV4,
    broadcast: bool,
    socket: Option<Arc<UdpSocket>>,
    table: Arc<Mutex<DiscoveryResult>>,
    recv_task: Option<JoinHandle<()>>,
}

impl Discovery {
    /// Create an unbound discovery protocol targeting `target:48899`.
    pub fn new(target: Ipv4Addr) -> Self {
        Self::with_port(target, DISCOVERY_PORT)
    }

    /// Create an unbound discovery protocol with an explicit port.
    pub fn with_port(target: Ipv4Addr, port: u16) -> Self {
        Self {
            target: SocketAddrV4::new(target, port),
            broadcast: false,
            socket: None,
            table: Arc::new(Mutex::new(DiscoveryResult::new())),
            recv_task: None,
        }
    }

    /// Mark the target as a subnet broadcast address.
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Bind the UDP socket and start the background receive task.
    /// Binding twice is a no-op.
    pub async fn bind(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(DiscoveryError::Bind)?;
        if self.broadcast {
            socket.set_broadcast(true).map_err(DiscoveryError::Bind)?;
        }
        debug!(target = %self.target, "discovery socket bound");
        let socket = Arc::new(socket);
        let recv_socket = Arc::clone(&socket);
        let table = Arc::clone(&self.table);
        self.recv_task = Some(tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                match recv_socket.recv_from(&mut buf).await {
                    Ok((len, source)) => record_reply(&table, source, &buf[..len]),
                    Err(err) => {
                        warn!(error = %err, "discovery receive failed");
                        break;
                    }
                }
            }
        }));
        self.socket = Some(socket);
        Ok(())
    }

    /// Send one discovery request to the target.
    ///
    /// Fails with [`DiscoveryError::NotBound`] before [`Discovery::bind`].
    pub async fn send_discovery_request(&self) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(DiscoveryError::NotBound)?;
        debug!(target = %self.target, "sending discovery request");
        socket
            .send_to(DISCOVERY_REQUEST, SocketAddr::V4(self.target))
            .await
            .map_err(DiscoveryError::Send)?;
        Ok(())
    }

    /// Snapshot of the accumulated result table.
    pub fn results(&self) -> DiscoveryResult {
        self.table.lock().expect("discovery table poisoned").clone()
    }

    /// Stop listening and release the socket.
    pub fn stop(&mut self) {
        if let Some(task) = self.recv_task.take() {
            task.abort();
        }
        self.socket = None;
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One-shot driver: bind, send the request `retry` times with `interval`
/// between sends plus a trailing grace period, and return the table.
pub async fn discover(target: Ipv4Addr, options: DiscoveryOptions) -> Result<DiscoveryResult> {
    let mut discovery =
        Discovery::with_port(target, options.port).with_broadcast(options.broadcast);
    discovery.bind().await?;
    for attempt in 0..options.retry {
        if attempt > 0 {
            tokio::time::sleep(options.interval).await;
        }
        discovery.send_discovery_request().await?;
    }
    // Grace period for replies to the last request.
    tokio::time::sleep(options.interval).await;
    let results = discovery.results();
    discovery.stop();
    Ok(results)
}

/// A parsed reply datagram: `reported-ip,machex,model`.
#[derive(Debug, PartialEq, Eq)]
struct Reply {
    reported_ip: Ipv4Addr,
    mac: MacAddress,
    model: String,
}

fn parse_reply(payload: &[u8]) -> Result<Reply> {
    let malformed = || DiscoveryError::MalformedReply {
        reply: String::from_utf8_lossy(payload).into_owned(),
    };
    let text = std::str::from_utf8(payload).map_err(|_| malformed())?;
    let mut fields = text.trim().splitn(3, ',');
    let reported_ip = fields
        .next()
        .and_then(|field| field.parse().ok())
        .ok_or_else(malformed)?;
    let mac = parse_mac(fields.next().ok_or_else(malformed)?)?;
    let model = fields.next().ok_or_else(malformed)?.to_string();
    Ok(Reply {
        reported_ip,
        mac,
        model,
    })
}

/// Parse a MAC given as 12 hex digits without separators.
fn parse_mac(field: &str) -> Result<MacAddress> {
    let malformed = || DiscoveryError::MalformedMac {
        mac: field.to_string(),
    };
    if field.len() != 12 || !field.is_ascii() {
        return Err(malformed());
    }
    let mut mac = MacAddress::default();
    for (i, byte) in mac.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&field[2 * i..2 * i + 2], 16).map_err(|_| malformed())?;
    }
    Ok(mac)
}

/// Render a MAC address as colon-separated lowercase hex.
pub fn format_mac(mac: &MacAddress) -> String {
    mac.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Record one reply under its source address. Malformed datagrams (other
/// chatter on the port) are logged and skipped.
fn record_reply(table: &Mutex<DiscoveryResult>, source: SocketAddr, payload: &[u8]) {
    let IpAddr::V4(source_ip) = source.ip() else {
        return;
    };
    match parse_reply(payload) {
        Ok(reply) => {
            debug!(
                mac = %format_mac(&reply.mac),
                ip = %source_ip,
                reported_ip = %reply.reported_ip,
                model = %reply.model,
                "discovery reply"
            );
            table
                .lock()
                .expect("discovery table poisoned")
                .entry(reply.mac)
                .or_default()
                .insert(source_ip);
        }
        Err(err) => warn!(error = %err, "ignoring malformed discovery reply"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddress = [0x98, 0xD8, 0x63, 0xA5, 0x9E, 0x5C];

    #[test]
    fn parses_well_formed_reply() {
        let reply = parse_reply(b"192.168.1.5,98d863a59e5c,MODELX").unwrap();
        assert_eq!(
            reply,
            Reply {
                reported_ip: Ipv4Addr::new(192, 168, 1, 5),
                mac: MAC,
                model: "MODELX".to_string(),
            }
        );
    }

    #[test]
    fn rejects_malformed_replies() {
        for payload in [
            b"".as_slice(),
            b"192.168.1.5",
            b"192.168.1.5,98d863a59e5c",
            b"not-an-ip,98d863a59e5c,MODELX",
            b"\xff\xfe,98d863a59e5c,MODELX",
        ] {
            assert!(matches!(
                parse_reply(payload).unwrap_err(),
                DiscoveryError::MalformedReply { .. }
            ));
        }
    }

    #[test]
    fn rejects_malformed_mac() {
        for mac in ["98d863a59e", "98d863a59e5c5c", "98d863a59g5c"] {
            let payload = format!("192.168.1.5,{mac},MODELX");
            assert!(matches!(
                parse_reply(payload.as_bytes()).unwrap_err(),
                DiscoveryError::MalformedMac { .. }
            ));
        }
    }

    #[test]
    fn formats_mac_with_colons() {
        assert_eq!(format_mac(&MAC), "98:d8:63:a5:9e:5c");
    }

    #[test]
    fn records_source_ip_not_reported_ip() {
        let table = Mutex::new(DiscoveryResult::new());
        let source: SocketAddr = "192.168.1.5:48899".parse().unwrap();
        record_reply(&table, source, b"10.0.0.99,98d863a59e5c,MODELX");

        let table = table.into_inner().unwrap();
        let ips = table.get(&MAC).unwrap();
        assert!(ips.contains(&Ipv4Addr::new(192, 168, 1, 5)));
        assert!(!ips.contains(&Ipv4Addr::new(10, 0, 0, 99)));
    }

    #[test]
    fn one_mac_accumulates_multiple_ips() {
        let table = Mutex::new(DiscoveryResult::new());
        for source in ["192.168.1.8:48899", "192.168.1.9:48899"] {
            let source: SocketAddr = source.parse().unwrap();
            record_reply(&table, source, b"192.168.1.8,98d863a59e5c,MODELX");
        }

        let table = table.into_inner().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&MAC).unwrap().len(), 2);
    }

    #[test]
    fn malformed_datagram_is_skipped() {
        let table = Mutex::new(DiscoveryResult::new());
        let source: SocketAddr = "192.168.1.5:48899".parse().unwrap();
        record_reply(&table, source, b"garbage");
        assert!(table.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_before_bind_is_a_usage_error() {
        let discovery = Discovery::new(Ipv4Addr::LOCALHOST);
        let err = discovery.send_discovery_request().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NotBound));
    }

    #[tokio::test]
    async fn discovers_relay_on_loopback() {
        let relay = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = relay.local_addr().unwrap().port();
        let relay_task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, from) = relay.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], DISCOVERY_REQUEST);
            relay
                .send_to(b"192.168.1.5,98d863a59e5c,MODELX", from)
                .await
                .unwrap();
        });

        let options = DiscoveryOptions {
            retry: 1,
            interval: Duration::from_millis(200),
            port,
            ..DiscoveryOptions::default()
        };
        let results = discover(Ipv4Addr::LOCALHOST, options).await.unwrap();

        let ips = results.get(&MAC).unwrap();
        assert!(ips.contains(&Ipv4Addr::LOCALHOST));
        relay_task.await.unwrap();
    }
}
