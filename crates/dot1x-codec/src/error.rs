//! Codec error types.

use thiserror::Error;

/// Errors produced while parsing or packing wire frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The buffer was shorter than the format requires.
    #[error("short frame: needed at least {needed} bytes, got {got}")]
    ShortFrame {
        /// Minimum bytes required.
        needed: usize,
        /// Bytes actually available.
        got: usize,
    },

    /// A length field did not match the buffer it describes.
    #[error("bad length field: header said {declared}, buffer had {actual}")]
    BadLength {
        /// Length declared by the frame.
        declared: usize,
        /// Length actually available.
        actual: usize,
    },

    /// The Ethernet frame's EtherType was not 0x888E (EAPOL); the frame
    /// should be silently dropped, not treated as an error by callers.
    #[error("unknown EtherType: {0:#06x}")]
    UnknownEtherType(u16),

    /// An unsupported EAPOL protocol version was seen (outside 1..=3).
    #[error("unsupported EAPOL version: {0}")]
    UnsupportedEapolVersion(u8),

    /// The RADIUS Response-Authenticator did not match the value computed
    /// from the shared secret and the stored request authenticator.
    #[error("RADIUS authenticator mismatch")]
    AuthenticatorMismatch,

    /// No request-authenticator binding was found for a RADIUS packet id;
    /// the reply cannot be validated and must be dropped.
    #[error("no request authenticator on file for packet id {0}")]
    UnknownPacketId(u8),

    /// The RADIUS packet carried an unrecognized code.
    #[error("unknown RADIUS code: {0}")]
    UnknownRadiusCode(u8),

    /// An EAP-Message attribute carried a malformed inner EAP PDU.
    #[error("malformed EAP PDU: {0}")]
    MalformedEap(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
