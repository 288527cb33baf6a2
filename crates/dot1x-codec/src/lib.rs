//! # dot1x-codec
//!
//! Wire formats for the dot1x authenticator: Ethernet and EAPOL framing on
//! the supplicant-facing side, EAP PDU framing shared by both sides, and
//! RADIUS packet framing plus its RFC 3579 EAP pass-through extensions and
//! RFC 2865/2866 authenticator cryptography on the AAA-facing side.

#![warn(missing_docs)]

pub mod crypto;
pub mod eap;
pub mod eapol;
pub mod error;
pub mod ethernet;
pub mod radius;

pub use eap::{EapCode, EapMessage};
pub use eapol::{EapolFrame, EapolType};
pub use error::{CodecError, CodecResult};
pub use ethernet::EthernetHeader;
pub use radius::{RadiusAttribute, RadiusCode, RadiusPacket};
