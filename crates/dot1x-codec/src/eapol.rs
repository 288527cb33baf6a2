//! EAPOL framing: `version(1) type(1) body-length(2) body`.

use crate::error::{CodecError, CodecResult};

const HEADER_LEN: usize = 4;

/// The version this authenticator emits on outgoing frames.
pub const EMIT_VERSION: u8 = 2;

/// EAPOL packet type (the header's `type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EapolType {
    /// Body is an EAP PDU.
    EapPacket,
    /// EAPOL-Start: no body.
    Start,
    /// EAPOL-Logoff: no body.
    Logoff,
    /// EAPOL-Key: opaque body, not interpreted by this authenticator.
    Key,
}

impl EapolType {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::EapPacket),
            1 => Some(Self::Start),
            2 => Some(Self::Logoff),
            3 => Some(Self::Key),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::EapPacket => 0,
            Self::Start => 1,
            Self::Logoff => 2,
            Self::Key => 3,
        }
    }
}

/// A parsed EAPOL frame.
#[derive(Debug, Clone)]
pub struct EapolFrame {
    /// Protocol version (1..=3 accepted on ingress).
    pub version: u8,
    /// Frame type.
    pub eapol_type: EapolType,
    /// Body bytes (empty for Start/Logoff).
    pub body: Vec<u8>,
}

/// Parses an EAPOL frame from an Ethernet payload.
pub fn parse(data: &[u8]) -> CodecResult<EapolFrame> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::ShortFrame {
            needed: HEADER_LEN,
            got: data.len(),
        });
    }
    let version = data[0];
    if !(1..=3).contains(&version) {
        return Err(CodecError::UnsupportedEapolVersion(version));
    }
    let eapol_type = EapolType::from_u8(data[1])
        .ok_or_else(|| CodecError::MalformedEap(format!("unknown EAPOL type {}", data[1])))?;
    let body_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    let body = &data[HEADER_LEN..];
    if body_len != body.len() {
        return Err(CodecError::BadLength {
            declared: body_len,
            actual: body.len(),
        });
    }
    Ok(EapolFrame {
        version,
        eapol_type,
        body: body.to_vec(),
    })
}

/// Packs an EAPOL frame, always emitting [`EMIT_VERSION`].
#[must_use]
pub fn pack(eapol_type: EapolType, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.push(EMIT_VERSION);
    out.push(eapol_type.to_u8());
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_eap_packet_body() {
        let framed = pack(EapolType::EapPacket, b"eap-pdu");
        let parsed = parse(&framed).unwrap();
        assert_eq!(parsed.version, EMIT_VERSION);
        assert_eq!(parsed.eapol_type, EapolType::EapPacket);
        assert_eq!(parsed.body, b"eap-pdu");
    }

    #[test]
    fn start_frame_has_empty_body() {
        let framed = pack(EapolType::Start, &[]);
        let parsed = parse(&framed).unwrap();
        assert_eq!(parsed.eapol_type, EapolType::Start);
        assert!(parsed.body.is_empty());
    }

    #[test]
    fn rejects_version_zero() {
        let mut framed = pack(EapolType::EapPacket, b"x");
        framed[0] = 0;
        assert!(matches!(
            parse(&framed),
            Err(CodecError::UnsupportedEapolVersion(0))
        ));
    }

    #[test]
    fn rejects_bad_length() {
        let mut framed = pack(EapolType::EapPacket, b"x");
        framed[2] = 0xFF;
        assert!(matches!(parse(&framed), Err(CodecError::BadLength { .. })));
    }
}
