//! UDP client for the LIFX LAN protocol
//!
//! The [`LanClient`] trait is the seam between the controller and the
//! socket: production code uses [`UdpClient`], tests inject
//! [`MockClient`](mock::MockClient).

pub mod mock;

use crate::error::{Error, Result};
use crate::protocol::{Message, TARGET_BROADCAST};
use get_if_addrs::{get_if_addrs, IfAddr};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

/// The UDP port LIFX devices listen on.
pub const LIFX_PORT: u16 = 56700;

const RECV_BUFFER_SIZE: usize = 1024;

/// Default 32-bit source identifier stamped on outbound frames.
///
/// Devices echo the source back in responses. It must be at least 2:
/// some older firmwares treat 0 as "ignore" and 1 as "broadcast the
/// response".
pub const DEFAULT_SOURCE: u32 = 2;

const DEFAULT_RECV_POLL: Duration = Duration::from_millis(200);

/// Message sending and receiving over the LAN.
///
/// `send` must be safe to call concurrently; a single client is shared by
/// reference across every device session.
pub trait LanClient: Send + Sync {
    /// Stamps the client source on the message and sends it to `dst`.
    fn send(&self, dst: SocketAddr, msg: &mut Message) -> Result<()>;

    /// Sends the message to the LIFX broadcast address.
    fn send_broadcast(&self, msg: &mut Message) -> Result<()>;

    /// Waits for the next inbound frame.
    ///
    /// Returns `Ok(None)` when the read timed out or the frame failed to
    /// decode; the caller is expected to poll again. Fatal socket errors
    /// are returned as `Err`.
    fn recv_from(&self) -> Result<Option<(Message, SocketAddr)>>;
}

/// Configuration for [`UdpClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Source identifier returned by devices in all responses. Must be
    /// greater than 1.
    pub source: u32,
    /// How long a single receive call blocks before yielding. Bounds how
    /// quickly the receive loop observes shutdown.
    pub recv_poll: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            source: DEFAULT_SOURCE,
            recv_poll: DEFAULT_RECV_POLL,
        }
    }
}

/// UDP socket client bound to an ephemeral port with broadcast enabled.
pub struct UdpClient {
    socket: UdpSocket,
    source: u32,
    broadcast_addr: SocketAddr,
}

impl UdpClient {
    /// Creates a new LIFX client with the given configuration.
    pub fn new(cfg: ClientConfig) -> Result<UdpClient> {
        if cfg.source < DEFAULT_SOURCE {
            return Err(Error::Config("source must be greater than 1".into()));
        }

        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(cfg.recv_poll))?;

        let broadcast_addr = resolve_broadcast_addr(LIFX_PORT)?;
        log::debug!(
            "Client bound to {} (source {}, broadcast {})",
            socket.local_addr()?,
            cfg.source,
            broadcast_addr
        );

        Ok(UdpClient {
            socket,
            source: cfg.source,
            broadcast_addr,
        })
    }
}

impl LanClient for UdpClient {
    fn send(&self, dst: SocketAddr, msg: &mut Message) -> Result<()> {
        msg.set_source(self.source);
        let data = msg.encode();
        self.socket.send_to(&data, dst)?;
        Ok(())
    }

    fn send_broadcast(&self, msg: &mut Message) -> Result<()> {
        msg.set_target(TARGET_BROADCAST);
        self.send(self.broadcast_addr, msg)
    }

    fn recv_from(&self) -> Result<Option<(Message, SocketAddr)>> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        match self.socket.recv_from(&mut buf) {
            Ok((n, addr)) => match Message::decode(&buf[..n]) {
                Ok(msg) => Ok(Some((msg, addr))),
                Err(e) => {
                    // Malformed frames are dropped, the socket stays usable.
                    log::debug!("Skipping malformed frame from {}: {}", addr, e);
                    Ok(None)
                }
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Derives the broadcast address of the first usable IPv4 interface
/// (up, non-loopback, broadcast-capable).
fn resolve_broadcast_addr(port: u16) -> Result<SocketAddr> {
    let interfaces = get_if_addrs()?;
    for iface in interfaces {
        if iface.is_loopback() {
            continue;
        }
        if let IfAddr::V4(ref v4) = iface.addr {
            if let Some(broadcast) = v4.broadcast {
                return Ok(SocketAddr::new(IpAddr::V4(broadcast), port));
            }
        }
    }
    Err(Error::NoBroadcastInterface)
}
