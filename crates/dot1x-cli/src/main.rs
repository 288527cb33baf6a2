//! dot1x - IEEE 802.1X pass-through authenticator
//!
//! Binds to a supplicant-facing interface and relays EAP over RADIUS to an
//! AAA server, implementing the RFC 4137 Full Authenticator + Pass-Through
//! state machine halves.

use std::net::IpAddr;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use dot1x_daemon::{DaemonConfig, Dispatcher, LoggingHooks};
use dot1x_types::MacAddress;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;

use app::Cli;

/// Standalone flag-driven deployments have no OpenFlow datapath/port pair
/// to derive a port identifier from; this stands in for one.
const DEFAULT_PORT_ID: MacAddress = MacAddress::new([0, 0, 0, 0, 0, 1]);

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = load_config(&cli)?;

    tracing::info!(dp_interface = %config.dp_interface, radius_interface = %config.radius_interface, "starting dot1x");

    let dispatcher = Dispatcher::spawn(config, Arc::new(LoggingHooks)).await?;
    tracing::info!(own_mac = %dispatcher.own_mac(), "dot1x running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    dispatcher.shutdown();

    Ok(())
}

/// Initializes the tracing subscriber once, for the whole process; every
/// library crate only emits events, it never configures a subscriber
/// itself.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Loads configuration from `--config` when given and present, falling
/// back to the individual flags otherwise.
fn load_config(cli: &Cli) -> Result<DaemonConfig> {
    if let Some(path) = &cli.config {
        if path.exists() {
            return Ok(DaemonConfig::load(path)?);
        }
        return Err(eyre!("configuration file not found: {}", path.display()));
    }

    let radius_ip: IpAddr = cli
        .radius_ip
        .parse()
        .map_err(|_| eyre!("invalid --radius-ip: {}", cli.radius_ip))?;

    let config = DaemonConfig {
        dp_interface: cli.interface.clone(),
        radius_interface: cli.interface.clone(),
        radius_ip,
        radius_secret: cli.radius_secret.clone(),
        radius_auth_port: 1812,
        radius_acct_port: 1813,
        nas_identifier: None,
        port_id: DEFAULT_PORT_ID,
    };
    config.validate()?;
    Ok(config)
}
