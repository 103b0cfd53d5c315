//! Accessory capability surface
//!
//! What the smart-home host sees of the bridge: a fixed pair of services
//! (identity plus a temperature sensor) and a synchronous getter for the
//! current temperature. The getter only reads the shared cache, so the host
//! can call it from any thread, as often as it likes, and it never fails.

use std::sync::Arc;

use log::debug;
use serde::Serialize;
use thermobridge_core::ReadingCache;

/// Manufacturer reported in the information service
pub const MANUFACTURER: &str = "thermobridge";

/// Serial number reported in the information service
pub const SERIAL_NUMBER: &str = "001";

/// Model reported in the information service
pub const MODEL: &str = "Arduino Temperature Sensor";

/// Service descriptor handed to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Service {
    /// Identity of the accessory
    #[serde(rename_all = "camelCase")]
    AccessoryInformation {
        name: String,
        manufacturer: &'static str,
        serial_number: &'static str,
        model: &'static str,
    },
    /// The temperature reading itself
    TemperatureSensor { name: String },
}

/// Capability surface every accessory exposes to the host
pub trait Accessory {
    /// Services this accessory registers
    fn list_services(&self) -> Vec<Service>;
}

/// Temperature sensor accessory backed by the reading cache
#[derive(Debug, Clone)]
pub struct TemperatureAccessory {
    name: String,
    cache: Arc<ReadingCache>,
}

impl TemperatureAccessory {
    /// Create an accessory reading from `cache`
    pub fn new(name: impl Into<String>, cache: Arc<ReadingCache>) -> Self {
        Self {
            name: name.into(),
            cache,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest cached temperature
    pub fn current_temperature(&self) -> f32 {
        let reading = self.cache.load();
        debug!("Handling temperature get: temp={}", reading);
        reading.value()
    }
}

impl Accessory for TemperatureAccessory {
    fn list_services(&self) -> Vec<Service> {
        debug!("Handling services get");
        vec![
            Service::AccessoryInformation {
                name: self.name.clone(),
                manufacturer: MANUFACTURER,
                serial_number: SERIAL_NUMBER,
                model: MODEL,
            },
            Service::TemperatureSensor {
                name: self.name.clone(),
            },
        ]
    }
}
