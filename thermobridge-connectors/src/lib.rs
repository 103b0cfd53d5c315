//! Host-side connectors for thermobridge
//!
//! ## Overview
//!
//! This crate puts `thermobridge-core` to work on a host: it opens the
//! serial port the microcontroller is attached to, feeds the bytes through
//! the core line decoder into a shared reading cache, answers the accessory
//! host's queries from that cache, and releases the port when the process
//! is told to stop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  bytes  ┌────────────────────────┐  Reading  ┌──────────────┐
//! │ SerialChannel│────────▶│ SerialTemperatureReader│──────────▶│ ReadingCache │
//! └──────┬───────┘         └────────────────────────┘           └──────┬───────┘
//!        │ close                                                       │ load
//!        │                                                             ▼
//! ┌──────┴──────────────┐  event  ┌───────────────────┐       ┌─────────────────────┐
//! │ ShutdownCoordinator │◀────────│ TerminationSource │       │ TemperatureAccessory│
//! └─────────────────────┘         └───────────────────┘       └─────────────────────┘
//! ```
//!
//! Everything left of the cache runs on one task (`bridge::run`). The
//! accessory only holds an `Arc<ReadingCache>` and can live anywhere.
//!
//! ## Seams
//!
//! - `SerialChannel`: the byte source. `SerialConnector` talks to a real
//!   port through tokio-serial; `MemoryChannel` replays recorded chunks.
//! - `TerminationSource`: where shutdown requests come from. `TerminationEvents`
//!   listens to OS signals and accepts injected events.
//! - `ProcessExit`: how the process ends. `StdProcessExit` calls
//!   `std::process::exit`; tests pass a closure.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use thermobridge_connectors::{
//!     bridge, BridgeConfig, ShutdownCoordinator, StdProcessExit,
//!     SerialTemperatureReader, TemperatureAccessory, TerminationEvents,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::from_file("config.json")?;
//! let mut reader = SerialTemperatureReader::open(config.serial())?;
//! let accessory = TemperatureAccessory::new(config.name(), reader.cache());
//!
//! let mut termination = TerminationEvents::new();
//! termination.listen_for_signals()?;
//!
//! let mut coordinator = ShutdownCoordinator::new(StdProcessExit);
//! bridge::run(&mut reader, &mut termination, &mut coordinator).await;
//! # Ok(())
//! # }
//! ```

pub mod accessory;
pub mod bridge;
pub mod config;
pub mod reader;
pub mod serial;
pub mod shutdown;

// Re-export common types
pub use accessory::{Accessory, Service, TemperatureAccessory};
pub use config::{BridgeConfig, ConfigError, SerialConfig};
pub use reader::{IngestStats, SerialTemperatureReader};
pub use serial::{MemoryChannel, SerialConnector};
pub use shutdown::{
    ProcessExit, ShutdownCoordinator, ShutdownState, StdProcessExit, TerminationEvent,
    TerminationEvents, TerminationSender, TerminationSource,
};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Not connected")]
    NotConnected,

    #[error("Failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Byte source the reader pulls from
///
/// Implementations own the underlying handle. `close` is called at most
/// once by the shutdown coordinator, and only while `is_open` is true.
#[async_trait::async_trait]
pub trait SerialChannel: Send {
    /// Read the next chunk into `buf`
    ///
    /// `Ok(0)` means the link is gone (device unplugged, end of replay).
    /// Must be cancel safe: the bridge drops pending reads on shutdown.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ConnectorError>;

    /// Check if the handle is still open
    fn is_open(&self) -> bool;

    /// Release the handle
    async fn close(&mut self) -> Result<(), ConnectorError>;

    /// Device path the channel was opened on
    fn path(&self) -> &str;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all channels
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Total bytes received
    pub bytes_received: u64,
    /// Total non-empty reads
    pub chunks_received: u64,
    /// Last error message
    pub last_error: Option<String>,
}
