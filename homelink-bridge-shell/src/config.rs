//! Configuration for the shell-command bridge.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use homelink_bridge_framework::{BridgeConfig, BridgeError, LoggingConfig, MqttConfig, Result};
use homelink_common::{DEFAULT_DISCOVERY_PREFIX, is_valid_topic_level};

use crate::formatter::snake_case;

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellBridgeConfig {
    /// Polling and command execution settings.
    #[serde(default)]
    pub software: SoftwareConfig,

    /// Identity of the device the sensors belong to.
    pub device: DeviceConfig,

    /// MQTT broker connection settings.
    pub mqtt_server: MqttConfig,

    /// Sensors to sample, in publishing order.
    pub sensors: Vec<SensorConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Polling and command execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareConfig {
    /// Seconds between two sensor polls (default: 30).
    #[serde(default = "default_refresh_period")]
    pub refresh_period_s: u64,

    /// Shell used to run sensor commands as `<shell> -c <command>` (default: "sh").
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Kill sensor commands running longer than this many seconds.
    /// No timeout when absent.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,

    /// Topic prefix the automation hub watches for discovery (default: "homeassistant").
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
}

fn default_refresh_period() -> u64 {
    30
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_discovery_prefix() -> String {
    DEFAULT_DISCOVERY_PREFIX.to_string()
}

impl Default for SoftwareConfig {
    fn default() -> Self {
        Self {
            refresh_period_s: default_refresh_period(),
            shell: default_shell(),
            command_timeout_secs: None,
            discovery_prefix: default_discovery_prefix(),
        }
    }
}

impl SoftwareConfig {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_period_s)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Static device identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    /// Stable unique key used in every topic and discovery identifier.
    pub serial_number: String,
}

/// A single shell-command sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Display name; its snake_case form is the payload key.
    pub name: String,

    /// Shell command whose trimmed stdout is the reading.
    pub command: String,

    #[serde(default)]
    pub device_class: String,

    #[serde(default)]
    pub state_class: String,

    #[serde(default)]
    pub unit_of_measurement: String,

    /// Optional icon, e.g. "mdi:thermometer".
    #[serde(default)]
    pub icon: Option<String>,
}

impl SensorConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            device_class: String::new(),
            state_class: String::new(),
            unit_of_measurement: String::new(),
            icon: None,
        }
    }
}

impl BridgeConfig for ShellBridgeConfig {
    fn mqtt(&self) -> &MqttConfig {
        &self.mqtt_server
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn validate(&self) -> Result<()> {
        if self.software.refresh_period_s == 0 {
            return Err(BridgeError::validation("refresh_period_s must be > 0"));
        }

        if self.software.command_timeout_secs == Some(0) {
            return Err(BridgeError::validation("command_timeout_secs must be > 0"));
        }

        if self.software.shell.trim().is_empty() {
            return Err(BridgeError::validation("shell must not be empty"));
        }

        if !is_valid_topic_level(&self.software.discovery_prefix) {
            return Err(BridgeError::validation(format!(
                "discovery_prefix '{}' is not a valid topic level",
                self.software.discovery_prefix
            )));
        }

        if !is_valid_topic_level(&self.device.serial_number) {
            return Err(BridgeError::validation(format!(
                "serial_number '{}' must be non-empty and contain no '/', '+' or '#'",
                self.device.serial_number
            )));
        }

        if self.mqtt_server.host.is_empty() {
            return Err(BridgeError::validation("mqtt_server.host must not be empty"));
        }

        if self.sensors.is_empty() {
            return Err(BridgeError::validation("At least one sensor must be configured"));
        }

        // Sensors whose keys collide would overwrite each other in payloads
        let mut keys: HashMap<String, &str> = HashMap::new();
        for sensor in &self.sensors {
            if sensor.name.trim().is_empty() {
                return Err(BridgeError::validation("Sensor name must not be empty"));
            }
            if sensor.command.trim().is_empty() {
                return Err(BridgeError::validation(format!(
                    "Sensor '{}' has an empty command",
                    sensor.name
                )));
            }

            let key = snake_case(&sensor.name);
            if key.is_empty() {
                return Err(BridgeError::validation(format!(
                    "Sensor name '{}' yields an empty key",
                    sensor.name
                )));
            }
            if let Some(previous) = keys.insert(key.clone(), &sensor.name) {
                return Err(BridgeError::validation(format!(
                    "Sensors '{}' and '{}' both map to key '{}'",
                    previous, sensor.name, key
                )));
            }
        }

        Ok(())
    }
}

impl ShellBridgeConfig {
    /// MQTT client id used when the broker section does not set one.
    pub fn default_client_id(&self, software_name: &str) -> String {
        format!(
            "{}-{}",
            software_name.to_lowercase(),
            self.device.serial_number
        )
    }
}
