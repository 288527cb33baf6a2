//! EAP PDU framing: `code(1) id(1) length(2) [type(1) type-data(..)]`.
//!
//! The `type` byte is only present when `code` is Request or Response.
//! Unknown EAP types are preserved as [`EapMessage::Generic`] with their
//! original encoded bytes intact, so a retransmission or an
//! integrity-check round-trip reproduces the exact wire bytes.

use crate::error::{CodecError, CodecResult};
use dot1x_types::MacAddress;

/// EAP type numbers this codec recognizes specially.
mod eap_type {
    pub const IDENTITY: u8 = 1;
    pub const LEGACY_NAK: u8 = 3;
    pub const MD5_CHALLENGE: u8 = 4;
    pub const TLS: u8 = 13;
}

/// EAP code (the `code` header field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EapCode {
    /// Request (1): authenticator -> supplicant.
    Request = 1,
    /// Response (2): supplicant -> authenticator.
    Response = 2,
    /// Success (3).
    Success = 3,
    /// Failure (4).
    Failure = 4,
}

impl EapCode {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Request),
            2 => Some(Self::Response),
            3 => Some(Self::Success),
            4 => Some(Self::Failure),
            _ => None,
        }
    }
}

/// A parsed or synthesized EAP-layer message.
///
/// `EapolStart`/`EapolLogoff` never appear on the wire as EAP PDUs — they
/// are synthesized by the dispatcher directly from the EAPOL header's
/// `type` field and carry no EAP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EapMessage {
    /// Synthetic trigger: the supplicant sent EAPOL-Start.
    EapolStart {
        /// Supplicant MAC.
        src_mac: MacAddress,
    },
    /// Synthetic trigger: the supplicant sent EAPOL-Logoff.
    EapolLogoff {
        /// Supplicant MAC.
        src_mac: MacAddress,
    },
    /// EAP-Identity request or response.
    Identity {
        /// Supplicant MAC.
        src_mac: MacAddress,
        /// EAP message identifier.
        message_id: u8,
        /// Request or Response.
        code: EapCode,
        /// The identity string (empty on a bare Identity Request).
        identity: String,
    },
    /// EAP-MD5-Challenge request or response.
    Md5Challenge {
        /// Supplicant MAC.
        src_mac: MacAddress,
        /// EAP message identifier.
        message_id: u8,
        /// Request or Response.
        code: EapCode,
        /// The challenge/response value.
        value: Vec<u8>,
        /// Optional trailing name octets.
        name: Vec<u8>,
    },
    /// Legacy NAK (type 3): supplicant rejects the proposed method(s).
    LegacyNak {
        /// Supplicant MAC.
        src_mac: MacAddress,
        /// EAP message identifier.
        message_id: u8,
        /// The EAP type(s) the supplicant is willing to do instead.
        desired_types: Vec<u8>,
    },
    /// EAP-TLS (or any TLS-derived method) request/response.
    TlsMessage {
        /// Supplicant MAC.
        src_mac: MacAddress,
        /// EAP message identifier.
        message_id: u8,
        /// Request or Response.
        code: EapCode,
        /// TLS flags octet.
        flags: u8,
        /// TLS record fragment.
        data: Vec<u8>,
    },
    /// EAP-Success: authentication succeeded, no further exchange.
    Success {
        /// Supplicant MAC.
        src_mac: MacAddress,
        /// EAP message identifier.
        message_id: u8,
    },
    /// EAP-Failure: authentication failed, no further exchange.
    Failure {
        /// Supplicant MAC.
        src_mac: MacAddress,
        /// EAP message identifier.
        message_id: u8,
    },
    /// Any EAP method this authenticator does not interpret. Carries the
    /// original encoded PDU bytes verbatim so pass-through and
    /// integrity-check round trips are byte-identical.
    Generic {
        /// Supplicant MAC.
        src_mac: MacAddress,
        /// EAP message identifier.
        message_id: u8,
        /// Request or Response.
        code: EapCode,
        /// EAP type number, if the PDU had one (absent for Success/Failure).
        eap_type: Option<u8>,
        /// The full original EAP PDU bytes.
        raw: Vec<u8>,
    },
}

impl EapMessage {
    /// The supplicant this message concerns.
    #[must_use]
    pub fn src_mac(&self) -> MacAddress {
        match self {
            Self::EapolStart { src_mac }
            | Self::EapolLogoff { src_mac }
            | Self::Identity { src_mac, .. }
            | Self::Md5Challenge { src_mac, .. }
            | Self::LegacyNak { src_mac, .. }
            | Self::TlsMessage { src_mac, .. }
            | Self::Success { src_mac, .. }
            | Self::Failure { src_mac, .. }
            | Self::Generic { src_mac, .. } => *src_mac,
        }
    }

    /// The EAP `message_id`, absent for the synthetic Start/Logoff events.
    #[must_use]
    pub fn message_id(&self) -> Option<u8> {
        match self {
            Self::EapolStart { .. } | Self::EapolLogoff { .. } => None,
            Self::Identity { message_id, .. }
            | Self::Md5Challenge { message_id, .. }
            | Self::LegacyNak { message_id, .. }
            | Self::TlsMessage { message_id, .. }
            | Self::Success { message_id, .. }
            | Self::Failure { message_id, .. }
            | Self::Generic { message_id, .. } => Some(*message_id),
        }
    }

    /// The EAP `code`, absent for the synthetic Start/Logoff events.
    #[must_use]
    pub fn code(&self) -> Option<EapCode> {
        match self {
            Self::EapolStart { .. } | Self::EapolLogoff { .. } => None,
            Self::Identity { code, .. }
            | Self::Md5Challenge { code, .. }
            | Self::TlsMessage { code, .. }
            | Self::Generic { code, .. } => Some(*code),
            Self::LegacyNak { .. } => Some(EapCode::Response),
            Self::Success { .. } => Some(EapCode::Success),
            Self::Failure { .. } => Some(EapCode::Failure),
        }
    }
}

/// Parses an EAP PDU (the body of an EAPOL EAP-Packet frame, or the
/// reassembled payload of one or more RADIUS EAP-Message attributes).
pub fn parse(data: &[u8], src_mac: MacAddress) -> CodecResult<EapMessage> {
    if data.len() < 4 {
        return Err(CodecError::ShortFrame {
            needed: 4,
            got: data.len(),
        });
    }
    let code = EapCode::from_u8(data[0])
        .ok_or_else(|| CodecError::MalformedEap(format!("unknown EAP code {}", data[0])))?;
    let message_id = data[1];
    let length = u16::from_be_bytes([data[2], data[3]]) as usize;
    if length != data.len() {
        return Err(CodecError::BadLength {
            declared: length,
            actual: data.len(),
        });
    }

    match code {
        EapCode::Success => Ok(EapMessage::Success { src_mac, message_id }),
        EapCode::Failure => Ok(EapMessage::Failure { src_mac, message_id }),
        EapCode::Request | EapCode::Response => {
            if data.len() < 5 {
                return Err(CodecError::ShortFrame {
                    needed: 5,
                    got: data.len(),
                });
            }
            let eap_type = data[4];
            let type_data = &data[5..];
            Ok(parse_typed(src_mac, message_id, code, eap_type, type_data, data))
        }
    }
}

fn parse_typed(
    src_mac: MacAddress,
    message_id: u8,
    code: EapCode,
    eap_type: u8,
    type_data: &[u8],
    raw: &[u8],
) -> EapMessage {
    match eap_type {
        eap_type::IDENTITY => EapMessage::Identity {
            src_mac,
            message_id,
            code,
            identity: String::from_utf8_lossy(type_data).into_owned(),
        },
        eap_type::LEGACY_NAK => EapMessage::LegacyNak {
            src_mac,
            message_id,
            desired_types: type_data.to_vec(),
        },
        eap_type::MD5_CHALLENGE if !type_data.is_empty() => {
            let value_size = type_data[0] as usize;
            if type_data.len() >= 1 + value_size {
                EapMessage::Md5Challenge {
                    src_mac,
                    message_id,
                    code,
                    value: type_data[1..1 + value_size].to_vec(),
                    name: type_data[1 + value_size..].to_vec(),
                }
            } else {
                EapMessage::Generic {
                    src_mac,
                    message_id,
                    code,
                    eap_type: Some(eap_type),
                    raw: raw.to_vec(),
                }
            }
        }
        eap_type::TLS if !type_data.is_empty() => EapMessage::TlsMessage {
            src_mac,
            message_id,
            code,
            flags: type_data[0],
            data: type_data[1..].to_vec(),
        },
        _ => EapMessage::Generic {
            src_mac,
            message_id,
            code,
            eap_type: Some(eap_type),
            raw: raw.to_vec(),
        },
    }
}

/// Packs an EAP PDU. Fails for the synthetic `EapolStart`/`EapolLogoff`
/// variants, which never exist as wire-encoded EAP PDUs.
pub fn pack(message: &EapMessage) -> CodecResult<Vec<u8>> {
    match message {
        EapMessage::EapolStart { .. } | EapMessage::EapolLogoff { .. } => Err(
            CodecError::MalformedEap("EAPOL-Start/Logoff have no EAP PDU encoding".into()),
        ),
        EapMessage::Generic { raw, .. } => Ok(raw.clone()),
        EapMessage::Success { message_id, .. } => Ok(pack_header(EapCode::Success, *message_id, &[])),
        EapMessage::Failure { message_id, .. } => Ok(pack_header(EapCode::Failure, *message_id, &[])),
        EapMessage::Identity {
            message_id,
            code,
            identity,
            ..
        } => {
            let mut type_data = vec![eap_type::IDENTITY];
            type_data.extend_from_slice(identity.as_bytes());
            Ok(pack_header(*code, *message_id, &type_data))
        }
        EapMessage::LegacyNak {
            message_id,
            desired_types,
            ..
        } => {
            let mut type_data = vec![eap_type::LEGACY_NAK];
            type_data.extend_from_slice(desired_types);
            Ok(pack_header(EapCode::Response, *message_id, &type_data))
        }
        EapMessage::Md5Challenge {
            message_id,
            code,
            value,
            name,
            ..
        } => {
            let mut type_data = vec![eap_type::MD5_CHALLENGE];
            #[allow(clippy::cast_possible_truncation)]
            type_data.push(value.len() as u8);
            type_data.extend_from_slice(value);
            type_data.extend_from_slice(name);
            Ok(pack_header(*code, *message_id, &type_data))
        }
        EapMessage::TlsMessage {
            message_id,
            code,
            flags,
            data,
            ..
        } => {
            let mut type_data = vec![eap_type::TLS, *flags];
            type_data.extend_from_slice(data);
            Ok(pack_header(*code, *message_id, &type_data))
        }
    }
}

fn pack_header(code: EapCode, message_id: u8, type_data: &[u8]) -> Vec<u8> {
    let has_type = matches!(code, EapCode::Request | EapCode::Response);
    let length = 4 + if has_type { type_data.len() } else { 0 };
    let mut out = Vec::with_capacity(length);
    out.push(code as u8);
    out.push(message_id);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(length as u16).to_be_bytes());
    if has_type {
        out.extend_from_slice(type_data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> MacAddress {
        MacAddress::new([0, 0x12, 0x34, 0x56, 0x78, 0x9a])
    }

    #[test]
    fn identity_round_trips() {
        let msg = EapMessage::Identity {
            src_mac: mac(),
            message_id: 1,
            code: EapCode::Request,
            identity: String::new(),
        };
        let bytes = pack(&msg).unwrap();
        assert_eq!(bytes, vec![1, 1, 0, 5, 1]);
        let parsed = parse(&bytes, mac()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn identity_response_carries_identity_string() {
        let msg = EapMessage::Identity {
            src_mac: mac(),
            message_id: 1,
            code: EapCode::Response,
            identity: "alice".to_string(),
        };
        let bytes = pack(&msg).unwrap();
        let parsed = parse(&bytes, mac()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn success_and_failure_round_trip_with_no_payload() {
        let success = EapMessage::Success {
            src_mac: mac(),
            message_id: 9,
        };
        let bytes = pack(&success).unwrap();
        assert_eq!(bytes, vec![3, 9, 0, 4]);
        assert_eq!(parse(&bytes, mac()).unwrap(), success);
    }

    #[test]
    fn md5_challenge_round_trips() {
        let msg = EapMessage::Md5Challenge {
            src_mac: mac(),
            message_id: 2,
            code: EapCode::Request,
            value: vec![0xde, 0xad, 0xbe, 0xef],
            name: vec![],
        };
        let bytes = pack(&msg).unwrap();
        assert_eq!(parse(&bytes, mac()).unwrap(), msg);
    }

    #[test]
    fn unknown_eap_type_preserves_raw_bytes() {
        let bytes = vec![2, 5, 0, 7, 55, 0xaa, 0xbb, 0xcc];
        let parsed = parse(&bytes, mac()).unwrap();
        match &parsed {
            EapMessage::Generic { raw, eap_type, .. } => {
                assert_eq!(*eap_type, Some(55));
                assert_eq!(raw, &bytes);
            }
            other => panic!("expected Generic, got {other:?}"),
        }
        assert_eq!(pack(&parsed).unwrap(), bytes);
    }

    #[test]
    fn cannot_pack_synthetic_start() {
        assert!(pack(&EapMessage::EapolStart { src_mac: mac() }).is_err());
    }

    #[test]
    fn bad_length_is_rejected() {
        let bytes = vec![3, 1, 0, 99];
        assert!(matches!(parse(&bytes, mac()), Err(CodecError::BadLength { .. })));
    }
}
