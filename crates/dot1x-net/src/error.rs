//! Transport error types.

use thiserror::Error;

/// Errors produced by the EAPOL link or the RADIUS link.
#[derive(Debug, Error)]
pub enum NetError {
    /// No capture device found and none was configured.
    #[error("no capture device found")]
    NoDeviceFound,

    /// The configured capture device does not exist.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Capture requires elevated privileges the process does not have.
    #[error("permission denied: raw capture requires elevated privileges")]
    PermissionDenied,

    /// A libpcap call failed.
    #[error("pcap error: {0}")]
    Pcap(String),

    /// The RADIUS UDP socket could not be bound or used.
    #[error("RADIUS socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The wire codec rejected a frame.
    #[error("codec error: {0}")]
    Codec(#[from] dot1x_codec::CodecError),

    /// The capture or socket worker has already shut down.
    #[error("link closed")]
    Closed,
}

/// Result alias for transport operations.
pub type NetResult<T> = std::result::Result<T, NetError>;
