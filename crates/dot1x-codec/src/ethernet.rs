//! Ethernet framing: `DST(6) SRC(6) EtherType(2) PAYLOAD`.

use crate::error::{CodecError, CodecResult};
use dot1x_types::MacAddress;

/// EtherType reserved for EAPOL (IEEE 802.1X) frames.
pub const ETHERTYPE_EAPOL: u16 = 0x888E;

const HEADER_LEN: usize = 14;

/// A parsed Ethernet header and a view of the remaining payload.
#[derive(Debug, Clone, Copy)]
pub struct EthernetHeader {
    /// Destination MAC address.
    pub dst: MacAddress,
    /// Source MAC address.
    pub src: MacAddress,
    /// EtherType field.
    pub ethertype: u16,
}

/// Parses an Ethernet header, returning it along with the payload slice.
///
/// Does not reject non-EAPOL EtherTypes itself: callers filter on
/// [`ETHERTYPE_EAPOL`] and drop anything else, per spec (non-EAPOL frames
/// are not an error condition, just not ours).
pub fn parse(data: &[u8]) -> CodecResult<(EthernetHeader, &[u8])> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::ShortFrame {
            needed: HEADER_LEN,
            got: data.len(),
        });
    }
    let dst = MacAddress::new(data[0..6].try_into().unwrap());
    let src = MacAddress::new(data[6..12].try_into().unwrap());
    let ethertype = u16::from_be_bytes([data[12], data[13]]);
    Ok((
        EthernetHeader { dst, src, ethertype },
        &data[HEADER_LEN..],
    ))
}

/// Packs an Ethernet frame around `payload`.
#[must_use]
pub fn pack(dst: MacAddress, src: MacAddress, ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&dst.octets());
    out.extend_from_slice(&src.octets());
    out.extend_from_slice(&ethertype.to_be_bytes());
    out.extend_from_slice(payload);
    out
}
