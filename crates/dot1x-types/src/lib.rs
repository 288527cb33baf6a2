//! # dot1x-types
//!
//! Shared identifiers used across the dot1x authenticator crates: the
//! canonical `MacAddress` type that doubles as both supplicant identity and
//! (via a synthetic encoding) switch port identity.

#![warn(missing_docs)]

pub mod mac;

pub use mac::{MacAddress, MacParseError};
