//! Bridge configuration
//!
//! The bridge reads the accessory host's JSON configuration file and picks
//! out its own entry, the one declared with `"accessory": "ArduinoTemperature"`:
//!
//! ```json
//! {
//!   "accessories": [
//!     { "accessory": "Thermostat", "name": "Hall" },
//!     { "accessory": "ArduinoTemperature", "name": "Study", "serialPath": "/dev/ttyACM0" }
//!   ]
//! }
//! ```
//!
//! Only `serialPath` is required. Any other keys, entries or top-level
//! sections belong to the host and are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thermobridge_core::constants::{DEFAULT_READ_CHUNK_SIZE, SERIAL_BAUD_RATE};
use thiserror::Error;

/// Accessory type this bridge registers under
pub const ACCESSORY_TYPE: &str = "ArduinoTemperature";

/// Display name used when the entry has none
pub const DEFAULT_NAME: &str = "Arduino Temperature";

/// Configuration errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON or an entry has the wrong shape
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// No entry declares this accessory type
    #[error("No accessory entry of type {0}")]
    MissingAccessory(&'static str),

    /// The entry has no `serialPath`
    #[error("Accessory entry {0} has no serialPath")]
    MissingSerialPath(String),
}

#[derive(Debug, Deserialize)]
struct HostConfig {
    #[serde(default)]
    accessories: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessoryEntry {
    name: Option<String>,
    serial_path: Option<String>,
}

/// Resolved settings for one bridge instance
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    name: String,
    serial: SerialConfig,
}

impl BridgeConfig {
    /// Load the host configuration file and resolve this accessory's entry
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&text)
    }

    /// Resolve this accessory's entry from a JSON document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let host: HostConfig = serde_json::from_str(text)?;

        let entry = host
            .accessories
            .into_iter()
            .find(|entry| entry.get("accessory").and_then(|v| v.as_str()) == Some(ACCESSORY_TYPE))
            .ok_or(ConfigError::MissingAccessory(ACCESSORY_TYPE))?;

        let entry: AccessoryEntry = serde_json::from_value(entry)?;
        let name = entry.name.unwrap_or_else(|| DEFAULT_NAME.to_owned());
        let serial_path = entry
            .serial_path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSerialPath(name.clone()))?;

        Ok(Self {
            name,
            serial: SerialConfig::new(serial_path),
        })
    }

    /// Accessory display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serial port settings
    pub fn serial(&self) -> SerialConfig {
        self.serial.clone()
    }
}

/// Serial port settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyACM0` or `COM3`
    pub path: String,
    /// Line speed, fixed by the firmware
    pub baud_rate: u32,
    /// Size of a single read
    pub read_buffer: usize,
}

impl SerialConfig {
    /// Create settings for a device path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: SERIAL_BAUD_RATE,
            read_buffer: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    /// Override the baud rate
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set read size in bytes (at least 1)
    pub fn read_buffer(mut self, size: usize) -> Self {
        self.read_buffer = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HOST_CONFIG: &str = r#"{
        "bridge": { "name": "Homebridge", "port": 51826 },
        "accessories": [
            { "accessory": "Thermostat", "name": "Hall" },
            { "accessory": "ArduinoTemperature", "name": "Study", "serialPath": "/dev/ttyACM0" }
        ]
    }"#;

    #[test]
    fn resolves_matching_entry() {
        let config = BridgeConfig::from_json(HOST_CONFIG).unwrap();

        assert_eq!(config.name(), "Study");
        assert_eq!(config.serial().path, "/dev/ttyACM0");
        assert_eq!(config.serial().baud_rate, 9600);
    }

    #[test]
    fn name_defaults_when_absent() {
        let json = r#"{ "accessories": [ { "accessory": "ArduinoTemperature", "serialPath": "COM3" } ] }"#;
        let config = BridgeConfig::from_json(json).unwrap();

        assert_eq!(config.name(), DEFAULT_NAME);
        assert_eq!(config.serial().path, "COM3");
    }

    #[test]
    fn missing_entry_is_an_error() {
        let json = r#"{ "accessories": [ { "accessory": "Thermostat" } ] }"#;
        let result = BridgeConfig::from_json(json);
        assert!(matches!(result, Err(ConfigError::MissingAccessory(ACCESSORY_TYPE))));

        let result = BridgeConfig::from_json("{}");
        assert!(matches!(result, Err(ConfigError::MissingAccessory(_))));
    }

    #[test]
    fn missing_serial_path_is_an_error() {
        let json = r#"{ "accessories": [ { "accessory": "ArduinoTemperature", "name": "Study", "serialPath": " " } ] }"#;
        match BridgeConfig::from_json(json) {
            Err(ConfigError::MissingSerialPath(name)) => assert_eq!(name, "Study"),
            other => panic!("Expected MissingSerialPath, got {:?}", other),
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(BridgeConfig::from_json("{ not json"), Err(ConfigError::Json(_))));

        let json = r#"{ "accessories": [ { "accessory": "ArduinoTemperature", "serialPath": 42 } ] }"#;
        assert!(matches!(BridgeConfig::from_json(json), Err(ConfigError::Json(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HOST_CONFIG.as_bytes()).unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.serial().path, "/dev/ttyACM0");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = BridgeConfig::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn serial_config_builder() {
        let serial = SerialConfig::new("/dev/ttyUSB0").baud_rate(115_200).read_buffer(0);

        assert_eq!(serial.baud_rate, 115_200);
        assert_eq!(serial.read_buffer, 1);
    }
}
