//! Daemon configuration: a YAML document naming the two interfaces this
//! authenticator sits between and the shared secret it speaks to the AAA
//! server with.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use dot1x_types::MacAddress;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, Result};

const DEFAULT_RADIUS_AUTH_PORT: u16 = 1812;
const DEFAULT_RADIUS_ACCT_PORT: u16 = 1813;

/// The authenticator's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Interface to capture/inject EAPOL frames on (the supplicant-facing
    /// side).
    pub dp_interface: String,

    /// Interface whose address the RADIUS socket binds to (the AAA-facing
    /// side).
    pub radius_interface: String,

    /// RADIUS server address.
    pub radius_ip: IpAddr,

    /// Shared secret for RADIUS Message-Authenticator and authenticator
    /// computation.
    pub radius_secret: String,

    /// RADIUS authentication port.
    #[serde(default = "default_auth_port")]
    pub radius_auth_port: u16,

    /// RADIUS accounting port.
    #[serde(default = "default_acct_port")]
    pub radius_acct_port: u16,

    /// NAS-Identifier attribute value. Defaults to the dp_interface's MAC
    /// once the daemon resolves it, if left unset here.
    pub nas_identifier: Option<String>,

    /// The synthetic port identifier this authenticator's single link
    /// represents, used to derive NAS-Port and as the supplicant table's
    /// port key (see `MacAddress::nas_port`). There is no OpenFlow
    /// controller behind this authenticator handing out per-datapath port
    /// ids, so it is configured directly; left unset, a single synthetic
    /// port is assumed.
    #[serde(default = "default_port_id")]
    pub port_id: MacAddress,
}

fn default_auth_port() -> u16 {
    DEFAULT_RADIUS_AUTH_PORT
}

fn default_acct_port() -> u16 {
    DEFAULT_RADIUS_ACCT_PORT
}

/// The synthetic single-port identifier assumed when `port_id` is left
/// out of the configuration file, matching `dot1x-cli`'s flag-only
/// default.
fn default_port_id() -> MacAddress {
    MacAddress::new([0, 0, 0, 0, 0, 1])
}

impl DaemonConfig {
    /// Loads and validates configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates required fields beyond what deserialization already
    /// enforces (non-empty interface names, a non-empty secret).
    pub fn validate(&self) -> Result<()> {
        if self.dp_interface.trim().is_empty() {
            return Err(DaemonError::config("dp_interface must not be empty"));
        }
        if self.radius_interface.trim().is_empty() {
            return Err(DaemonError::config("radius_interface must not be empty"));
        }
        if self.radius_secret.is_empty() {
            return Err(DaemonError::config("radius_secret must not be empty"));
        }
        Ok(())
    }

    /// Resolves `radius_interface`'s first IPv4 address, the address the
    /// RADIUS socket binds to so AAA traffic egresses that interface.
    pub fn radius_interface_bind_ip(&self) -> Result<IpAddr> {
        netdev::get_interfaces()
            .into_iter()
            .find(|iface| iface.name == self.radius_interface)
            .and_then(|iface| iface.ipv4.first().map(|net| IpAddr::V4(net.addr())))
            .ok_or_else(|| {
                DaemonError::config(format!(
                    "radius_interface '{}' has no IPv4 address",
                    self.radius_interface
                ))
            })
    }

    /// The default configuration file path, following the platform
    /// convention used elsewhere in this codebase.
    #[must_use]
    pub fn default_path() -> PathBuf {
        if cfg!(target_os = "macos") {
            PathBuf::from("/Library/Application Support/dot1x/dot1x.yaml")
        } else if cfg!(target_os = "linux") {
            PathBuf::from("/etc/dot1x/dot1x.yaml")
        } else if cfg!(target_os = "windows") {
            PathBuf::from(r"C:\ProgramData\dot1x\dot1x.yaml")
        } else {
            PathBuf::from("dot1x.yaml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        "dp_interface: eth0\n\
         radius_interface: eth1\n\
         radius_ip: 10.0.0.1\n\
         radius_secret: SECRET\n\
         port_id: \"00:00:00:00:aa:01\"\n"
    }

    #[test]
    fn parses_required_keys_and_defaults_ports() {
        let config: DaemonConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.dp_interface, "eth0");
        assert_eq!(config.radius_auth_port, DEFAULT_RADIUS_AUTH_PORT);
        assert_eq!(config.radius_acct_port, DEFAULT_RADIUS_ACCT_PORT);
        assert!(config.nas_identifier.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_empty_secret() {
        let mut config: DaemonConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        config.radius_secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn optional_keys_override_when_present() {
        let yaml = format!("{}radius_auth_port: 11812\nnas_identifier: \"44-44-44-44-44-44:\"\n", sample_yaml());
        let config: DaemonConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.radius_auth_port, 11812);
        assert_eq!(config.nas_identifier.as_deref(), Some("44-44-44-44-44-44:"));
    }

    #[test]
    fn port_id_defaults_when_absent() {
        let yaml = "dp_interface: eth0\n\
                    radius_interface: eth1\n\
                    radius_ip: 10.0.0.1\n\
                    radius_secret: SECRET\n";
        let config: DaemonConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port_id, default_port_id());
    }
}
