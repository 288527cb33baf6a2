//! RADIUS packet framing (RFC 2865) with the EAP pass-through extensions
//! of RFC 3579: `EAP-Message` fragmentation/reassembly and the
//! `Message-Authenticator` attribute.

use crate::error::{CodecError, CodecResult};

const HEADER_LEN: usize = 20;
const MAX_ATTR_VALUE_LEN: usize = 253;

/// RADIUS packet code (the header's `code` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusCode {
    /// Access-Request (1).
    AccessRequest,
    /// Access-Accept (2).
    AccessAccept,
    /// Access-Reject (3).
    AccessReject,
    /// Accounting-Request (4).
    AccountingRequest,
    /// Accounting-Response (5).
    AccountingResponse,
    /// Access-Challenge (11).
    AccessChallenge,
}

impl RadiusCode {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::AccessRequest),
            2 => Some(Self::AccessAccept),
            3 => Some(Self::AccessReject),
            4 => Some(Self::AccountingRequest),
            5 => Some(Self::AccountingResponse),
            11 => Some(Self::AccessChallenge),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::AccessRequest => 1,
            Self::AccessAccept => 2,
            Self::AccessReject => 3,
            Self::AccountingRequest => 4,
            Self::AccountingResponse => 5,
            Self::AccessChallenge => 11,
        }
    }
}

/// RADIUS attribute type numbers used by this authenticator.
pub mod attr_type {
    /// User-Name (1).
    pub const USER_NAME: u8 = 1;
    /// User-Password (2).
    pub const USER_PASSWORD: u8 = 2;
    /// NAS-IP-Address (4).
    pub const NAS_IP_ADDRESS: u8 = 4;
    /// NAS-Port (5).
    pub const NAS_PORT: u8 = 5;
    /// State (24).
    pub const STATE: u8 = 24;
    /// Class (25).
    pub const CLASS: u8 = 25;
    /// Vendor-Specific (26).
    pub const VENDOR_SPECIFIC: u8 = 26;
    /// Session-Timeout (27).
    pub const SESSION_TIMEOUT: u8 = 27;
    /// Called-Station-Id (30).
    pub const CALLED_STATION_ID: u8 = 30;
    /// Calling-Station-Id (31).
    pub const CALLING_STATION_ID: u8 = 31;
    /// NAS-Identifier (32).
    pub const NAS_IDENTIFIER: u8 = 32;
    /// Acct-Status-Type (40).
    pub const ACCT_STATUS_TYPE: u8 = 40;
    /// Acct-Session-Id (44).
    pub const ACCT_SESSION_ID: u8 = 44;
    /// EAP-Message (79).
    pub const EAP_MESSAGE: u8 = 79;
    /// Message-Authenticator (80).
    pub const MESSAGE_AUTHENTICATOR: u8 = 80;
    /// NAS-Port-Type (61).
    pub const NAS_PORT_TYPE: u8 = 61;
}

/// A single RADIUS attribute: type, raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadiusAttribute {
    /// Attribute type number.
    pub attr_type: u8,
    /// Attribute value bytes (not including the type/length octets).
    pub value: Vec<u8>,
}

impl RadiusAttribute {
    /// Builds an attribute from raw value bytes.
    #[must_use]
    pub fn new(attr_type: u8, value: Vec<u8>) -> Self {
        Self { attr_type, value }
    }
}

/// A parsed or to-be-packed RADIUS packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadiusPacket {
    /// Packet code.
    pub code: RadiusCode,
    /// Packet identifier, correlates requests with replies.
    pub identifier: u8,
    /// Request/Response Authenticator field (16 bytes).
    pub authenticator: [u8; 16],
    /// Attributes in wire order.
    pub attributes: Vec<RadiusAttribute>,
}

impl RadiusPacket {
    /// Returns the concatenated value bytes of every attribute of
    /// `attr_type`, for attributes like EAP-Message that may be fragmented
    /// across repeated attributes.
    #[must_use]
    pub fn concat_attr(&self, attr_type: u8) -> Vec<u8> {
        let mut out = Vec::new();
        for attr in &self.attributes {
            if attr.attr_type == attr_type {
                out.extend_from_slice(&attr.value);
            }
        }
        out
    }

    /// Returns the value of the first attribute of `attr_type`, if any.
    #[must_use]
    pub fn first_attr(&self, attr_type: u8) -> Option<&[u8]> {
        self.attributes
            .iter()
            .find(|a| a.attr_type == attr_type)
            .map(|a| a.value.as_slice())
    }
}

/// Splits `eap_pdu` into one or more EAP-Message attribute values, each at
/// most [`MAX_ATTR_VALUE_LEN`] bytes, per RFC 3579 section 3.1.
#[must_use]
pub fn fragment_eap_message(eap_pdu: &[u8]) -> Vec<RadiusAttribute> {
    if eap_pdu.is_empty() {
        return vec![RadiusAttribute::new(attr_type::EAP_MESSAGE, Vec::new())];
    }
    eap_pdu
        .chunks(MAX_ATTR_VALUE_LEN)
        .map(|chunk| RadiusAttribute::new(attr_type::EAP_MESSAGE, chunk.to_vec()))
        .collect()
}

/// Serializes a [`RadiusPacket`] to wire bytes. The `authenticator` field
/// is written as-is; callers are responsible for computing it (via
/// [`crate::crypto`]) before calling this for anything but the initial
/// Access-Request, whose authenticator is caller-supplied random bytes.
pub fn pack(packet: &RadiusPacket) -> CodecResult<Vec<u8>> {
    let mut attrs = Vec::new();
    for attr in &packet.attributes {
        if attr.value.len() > MAX_ATTR_VALUE_LEN {
            return Err(CodecError::MalformedEap(format!(
                "attribute {} value of {} bytes exceeds {MAX_ATTR_VALUE_LEN}",
                attr.attr_type,
                attr.value.len()
            )));
        }
        attrs.push(attr.attr_type);
        #[allow(clippy::cast_possible_truncation)]
        attrs.push((attr.value.len() + 2) as u8);
        attrs.extend_from_slice(&attr.value);
    }

    let total_len = HEADER_LEN + attrs.len();
    let mut out = Vec::with_capacity(total_len);
    out.push(packet.code.to_u8());
    out.push(packet.identifier);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(total_len as u16).to_be_bytes());
    out.extend_from_slice(&packet.authenticator);
    out.extend_from_slice(&attrs);
    Ok(out)
}

/// Parses a RADIUS packet from wire bytes.
pub fn parse(data: &[u8]) -> CodecResult<RadiusPacket> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::ShortFrame {
            needed: HEADER_LEN,
            got: data.len(),
        });
    }
    let code = RadiusCode::from_u8(data[0]).ok_or(CodecError::UnknownRadiusCode(data[0]))?;
    let identifier = data[1];
    let declared_len = u16::from_be_bytes([data[2], data[3]]) as usize;
    if declared_len != data.len() {
        return Err(CodecError::BadLength {
            declared: declared_len,
            actual: data.len(),
        });
    }
    let mut authenticator = [0u8; 16];
    authenticator.copy_from_slice(&data[4..20]);

    let mut attributes = Vec::new();
    let mut rest = &data[HEADER_LEN..];
    while !rest.is_empty() {
        if rest.len() < 2 {
            return Err(CodecError::MalformedEap("truncated attribute header".into()));
        }
        let attr_type = rest[0];
        let attr_len = rest[1] as usize;
        if attr_len < 2 || attr_len > rest.len() {
            return Err(CodecError::MalformedEap(format!(
                "attribute {attr_type} declared length {attr_len} out of range"
            )));
        }
        let value = rest[2..attr_len].to_vec();
        attributes.push(RadiusAttribute::new(attr_type, value));
        rest = &rest[attr_len..];
    }

    Ok(RadiusPacket {
        code,
        identifier,
        authenticator,
        attributes,
    })
}
