use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use thiserror::Error;

use crate::packet::MagicPacket;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("unable to create the socket")]
    SocketCreate(#[source] io::Error),

    #[error("unable to enable broadcast on the socket")]
    SocketOption(#[source] io::Error),

    #[error("unable to send the wake-up packet")]
    Send(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrFamily {
    V4,
    V6,
}

impl fmt::Display for AddrFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrFamily::V4 => write!(f, "IPv4"),
            AddrFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Where the magic packet goes. The address family follows from the IP
/// itself, so a family/address-length mismatch cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub ip: IpAddr,
    pub port: u16,
}

impl Destination {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn family(&self) -> AddrFamily {
        match self.ip {
            IpAddr::V4(_) => AddrFamily::V4,
            IpAddr::V6(_) => AddrFamily::V6,
        }
    }

    fn bind_addr(&self) -> SocketAddr {
        match self.family() {
            AddrFamily::V4 => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            AddrFamily::V6 => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        }
    }
}

/// The datagram capability the transmitter needs from the OS. Kept
/// minimal so tests can substitute a fake socket.
pub trait DatagramSocket {
    fn enable_broadcast(&self) -> io::Result<()>;
    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize>;
}

impl DatagramSocket for UdpSocket {
    fn enable_broadcast(&self) -> io::Result<()> {
        self.set_broadcast(true)
    }

    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, dest)
    }
}

/// Emits the magic packet as a single datagram. Fire-and-forget: WoL
/// defines no reply, so success only means the OS accepted the packet.
pub fn send(packet: &MagicPacket, dest: Destination) -> Result<(), SendError> {
    send_with(|d: &Destination| UdpSocket::bind(d.bind_addr()), packet, dest)
}

fn send_with<S, F>(open: F, packet: &MagicPacket, dest: Destination) -> Result<(), SendError>
where
    S: DatagramSocket,
    F: FnOnce(&Destination) -> io::Result<S>,
{
    let socket = open(&dest).map_err(SendError::SocketCreate)?;

    // WoL targets are usually broadcast or otherwise unrouted addresses;
    // without SO_BROADCAST the OS refuses to send to them.
    socket.enable_broadcast().map_err(SendError::SocketOption)?;

    let payload = packet.as_bytes();
    let written = socket
        .send_to(payload, SocketAddr::new(dest.ip, dest.port))
        .map_err(SendError::Send)?;
    if written != payload.len() {
        return Err(SendError::Send(io::Error::other(format!(
            "short send: {written} of {} bytes",
            payload.len(),
        ))));
    }

    Ok(())
}
