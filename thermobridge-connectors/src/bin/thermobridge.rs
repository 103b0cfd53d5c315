//! thermobridge host binary
//!
//! Reads the accessory host's configuration, opens the microcontroller's
//! serial port and keeps the latest temperature cached until a termination
//! signal arrives, at which point the port is closed and the process exits.
//!
//! ## Usage
//!
//! ```bash
//! # Config path as an argument
//! thermobridge ~/.homebridge/config.json
//!
//! # Or through the environment
//! THERMOBRIDGE_CONFIG=~/.homebridge/config.json thermobridge
//!
//! # Show every accepted reading
//! RUST_LOG=debug thermobridge config.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use thermobridge_connectors::{
    bridge, Accessory, BridgeConfig, SerialTemperatureReader, ShutdownCoordinator,
    StdProcessExit, TemperatureAccessory, TerminationEvents,
};

const CONFIG_ENV: &str = "THERMOBRIDGE_CONFIG";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Library code logs through `log`; the subscriber picks those records up
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(PathBuf::from)
        .with_context(|| format!("usage: thermobridge <config.json> (or set {})", CONFIG_ENV))?;

    let config = BridgeConfig::from_file(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    let serial = config.serial();
    let mut reader = SerialTemperatureReader::open(serial.clone())
        .with_context(|| format!("opening serial port {}", serial.path))?;

    let accessory = TemperatureAccessory::new(config.name(), reader.cache());
    for service in accessory.list_services() {
        info!("Registered service {:?}", service);
    }

    let mut termination = TerminationEvents::new();
    termination
        .listen_for_signals()
        .context("installing signal handlers")?;

    info!(
        "thermobridge {} finished initializing: {} on {}",
        thermobridge_core::VERSION,
        accessory.name(),
        serial.path
    );

    let mut coordinator = ShutdownCoordinator::new(StdProcessExit);
    let code = bridge::run(&mut reader, &mut termination, &mut coordinator).await;

    // StdProcessExit has already ended the process
    std::process::exit(code)
}
