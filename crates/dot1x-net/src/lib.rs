//! # dot1x-net
//!
//! The two physical transports the authenticator sits between: raw L2
//! EAPOL capture/injection on the supplicant-facing interface, and a
//! RADIUS UDP socket on the AAA-facing side.

#![warn(missing_docs)]

pub mod eapol_link;
pub mod error;
pub mod radius_link;

pub use eapol_link::{EapolLink, EapolLinkConfig, InboundEapol, OutboundEapol};
pub use error::{NetError, NetResult};
pub use radius_link::{RadiusLink, RadiusLinkConfig};
