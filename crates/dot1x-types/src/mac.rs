//! MAC address type: supplicant identity and, via a synthetic encoding,
//! switch-port identity.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The reserved PAE group address EAPOL frames are sent to/from:
/// `01:80:C2:00:00:03`.
pub const PAE_GROUP_ADDRESS: MacAddress = MacAddress([0x01, 0x80, 0xC2, 0x00, 0x00, 0x03]);

/// A 48-bit MAC address with a stable canonical textual form.
///
/// Used both as a supplicant's identity and, for port identifiers, as a
/// synthetic address whose last two octets encode a datapath id and a
/// port number (see [`MacAddress::nas_port`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Error returned when a string is not a valid MAC address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid MAC address: {0}")]
pub struct MacParseError(String);

impl MacAddress {
    /// Creates a MAC address from its six octets.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// The broadcast address `ff:ff:ff:ff:ff:ff`.
    #[must_use]
    pub const fn broadcast() -> Self {
        Self([0xFF; 6])
    }

    /// Decodes the RADIUS `NAS-Port` integer from this address's last two
    /// octets: the fifth octet is the datapath id, the sixth is the port
    /// number, and both are packed big-endian as if each were a 16-bit
    /// field.
    #[must_use]
    pub fn nas_port(&self) -> u32 {
        (u32::from(self.0[4]) << 16) | u32::from(self.0[5])
    }

    /// Formats this address as `xx-xx-xx-xx-xx-xx:`, the canonical form
    /// RADIUS `Called-Station-Id`/`Calling-Station-Id` attributes use.
    #[must_use]
    pub fn to_station_id(self) -> String {
        format!(
            "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}:",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim_end_matches(':').split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(MacParseError(s.to_string()));
        }
        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(parts.iter()) {
            *octet = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        Ok(Self(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase_colon_separated() {
        let mac = MacAddress::new([0x00, 0x12, 0x34, 0x56, 0x78, 0x9a]);
        assert_eq!(mac.to_string(), "00:12:34:56:78:9a");
    }

    #[test]
    fn parses_colon_and_dash_forms() {
        assert_eq!(
            "00:12:34:56:78:9A".parse::<MacAddress>().unwrap(),
            "00-12-34-56-78-9a".parse::<MacAddress>().unwrap()
        );
    }

    #[test]
    fn parses_trailing_colon_station_id_form() {
        let mac: MacAddress = "44-44-44-44-44-44:".parse().unwrap();
        assert_eq!(mac.octets(), [0x44; 6]);
    }

    #[test]
    fn station_id_round_trips_through_display() {
        let mac = MacAddress::new([0x00, 0x12, 0x34, 0x56, 0x78, 0x9a]);
        assert_eq!(mac.to_station_id(), "00-12-34-56-78-9a:");
    }

    #[test]
    fn nas_port_decodes_last_two_octets() {
        let port_id: MacAddress = "00:00:00:00:aa:01".parse().unwrap();
        assert_eq!(port_id.nas_port(), 0x00aa_0001);
    }

    #[test]
    fn pae_group_address_is_reserved_multicast() {
        assert_eq!(PAE_GROUP_ADDRESS.to_string(), "01:80:c2:00:00:03");
    }
}
