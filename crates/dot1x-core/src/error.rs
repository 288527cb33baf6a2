//! Core error types.

use thiserror::Error;

/// Errors produced by the state machine, timer or supplicant table.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No session exists for the given supplicant/port pair.
    #[error("no session for {0} on port {1}")]
    NoSession(dot1x_types::MacAddress, dot1x_types::MacAddress),

    /// The RADIUS packet-id space is exhausted; no free id could be
    /// allocated.
    #[error("RADIUS packet id space exhausted")]
    PacketIdExhausted,

    /// A RADIUS reply referenced a packet id with no outstanding request.
    #[error("no outstanding request for RADIUS packet id {0}")]
    UnknownPacketId(u8),

    /// The wire codec rejected a frame this component needed to build.
    #[error("codec error: {0}")]
    Codec(#[from] dot1x_codec::CodecError),
}

/// Result alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
