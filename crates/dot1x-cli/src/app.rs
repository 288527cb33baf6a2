//! CLI argument definition using clap.

use std::path::PathBuf;

use clap::Parser;

/// Runs the dot1x 802.1X pass-through authenticator.
#[derive(Parser, Debug)]
#[command(
    name = "dot1x",
    author,
    version,
    about = "IEEE 802.1X pass-through authenticator with RADIUS EAP relay",
    long_about = "Sits between a supplicant-facing switch port and a RADIUS/AAA server, \
                  speaking EAPOL on one side and RADIUS pass-through EAP (RFC 3579) on the other."
)]
pub struct Cli {
    /// YAML configuration file. When present, every value in it takes
    /// precedence over the flags below.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Interface to listen for EAPOL frames on, used when no configuration
    /// file is given.
    #[arg(short, long, default_value = "eth0")]
    pub interface: String,

    /// RADIUS server address, used when no configuration file is given.
    #[arg(long = "radius-ip", default_value = "127.0.0.1")]
    pub radius_ip: String,

    /// RADIUS shared secret, used when no configuration file is given.
    #[arg(long = "radius-secret", default_value = "SECRET")]
    pub radius_secret: String,

    /// Increase verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long)]
    pub quiet: bool,
}
