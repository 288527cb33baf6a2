//! The AAA-facing link: a UDP socket to the RADIUS server for both
//! authentication (Access-Request/Accept/Reject/Challenge) and accounting
//! (Accounting-Request/Response) traffic.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::NetResult;

/// Largest RADIUS packet this link will attempt to receive. RFC 2865
/// bounds a packet at 4096 bytes.
const MAX_RADIUS_PACKET: usize = 4096;

/// Configuration for the RADIUS UDP transport.
#[derive(Debug, Clone)]
pub struct RadiusLinkConfig {
    /// Local address to bind the socket to.
    pub bind_addr: SocketAddr,
    /// Authentication server address (Access-Request destination).
    pub auth_server_addr: SocketAddr,
    /// Accounting server address (Accounting-Request destination). Often
    /// the same host as `auth_server_addr` on the next port up.
    pub acct_server_addr: SocketAddr,
}

/// An open RADIUS UDP transport.
pub struct RadiusLink {
    socket: UdpSocket,
    config: RadiusLinkConfig,
}

impl RadiusLink {
    /// Binds the local socket described by `config`.
    pub async fn bind(config: RadiusLinkConfig) -> NetResult<Self> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        debug!(
            "RADIUS link bound to {} (auth={}, acct={})",
            config.bind_addr, config.auth_server_addr, config.acct_server_addr
        );
        Ok(Self { socket, config })
    }

    /// Sends a raw RADIUS packet to the authentication server.
    pub async fn send_auth(&self, bytes: &[u8]) -> NetResult<()> {
        self.socket.send_to(bytes, self.config.auth_server_addr).await?;
        Ok(())
    }

    /// Sends a raw RADIUS packet to the accounting server.
    pub async fn send_acct(&self, bytes: &[u8]) -> NetResult<()> {
        self.socket.send_to(bytes, self.config.acct_server_addr).await?;
        Ok(())
    }

    /// Waits for the next datagram from either server, returning the
    /// sender's address alongside the raw bytes.
    pub async fn receive(&self) -> NetResult<(SocketAddr, Vec<u8>)> {
        let mut buf = vec![0u8; MAX_RADIUS_PACKET];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((from, buf))
    }

    /// The configured authentication server address.
    #[must_use]
    pub fn auth_server_addr(&self) -> SocketAddr {
        self.config.auth_server_addr
    }

    /// The configured accounting server address.
    #[must_use]
    pub fn acct_server_addr(&self) -> SocketAddr {
        self.config.acct_server_addr
    }
}
