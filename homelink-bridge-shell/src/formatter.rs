//! Discovery-config and state payloads, and the topics they go to.
//!
//! Everything here is a pure projection of a [`Device`]: nothing is cached,
//! and formatting the same device twice yields identical bytes (maps are
//! ordered by key).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use homelink_common::{SoftwareIdentity, TopicBuilder};

use crate::device::Device;

/// Component platform for every sensor.
pub const SENSOR_PLATFORM: &str = "sensor";

/// QoS the automation hub is asked to subscribe with.
pub const DISCOVERY_QOS: u8 = 1;

/// Payload construction errors.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("sensor '{sensor}' value '{value}' is not a finite number")]
    NotNumeric { sensor: String, value: String },

    #[error("sensors '{first}' and '{second}' both map to key '{key}'")]
    KeyCollision {
        key: String,
        first: String,
        second: String,
    },

    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Device discovery-config payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    pub device: DeviceBlock,
    #[serde(rename = "o")]
    pub origin: OriginBlock,
    #[serde(rename = "cmps")]
    pub components: BTreeMap<String, Component>,
    pub state_topic: String,
    pub qos: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBlock {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginBlock {
    pub name: String,
    pub sw: String,
    pub url: String,
}

/// One sensor entity inside the discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub platform: String,
    pub device_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    pub unit_of_measurement: String,
    pub value_template: String,
    pub unique_id: String,
    pub state_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Builds payloads and topics for one software identity.
#[derive(Debug, Clone)]
pub struct PayloadFormatter {
    identity: SoftwareIdentity,
    topics: TopicBuilder,
}

impl PayloadFormatter {
    pub fn new(identity: SoftwareIdentity) -> Self {
        let topics = TopicBuilder::new(&identity.name);
        Self { identity, topics }
    }

    /// Use a discovery prefix other than the default.
    pub fn with_discovery_prefix(identity: SoftwareIdentity, discovery_prefix: &str) -> Self {
        let topics = TopicBuilder::with_discovery_prefix(discovery_prefix, &identity.name);
        Self { identity, topics }
    }

    pub fn identity(&self) -> &SoftwareIdentity {
        &self.identity
    }

    /// `<discovery_prefix>/device/<software>/<serial>/config`
    pub fn config_topic(&self, device: &Device) -> String {
        self.topics.config_topic(device.serial_number())
    }

    /// `<software>/<serial>/state`
    pub fn state_topic(&self, device: &Device) -> String {
        self.topics.state_topic(device.serial_number())
    }

    /// Build the discovery payload structure.
    ///
    /// Fails when two sensors map to the same key rather than dropping one.
    pub fn discovery_payload(&self, device: &Device) -> Result<DiscoveryPayload, FormatError> {
        let info = device.info();
        let state_topic = self.state_topic(device);

        let mut components = BTreeMap::new();
        for sensor in device.sensors() {
            let config = sensor.config();
            let component = Component {
                name: config.name.clone(),
                platform: SENSOR_PLATFORM.to_string(),
                device_class: config.device_class.clone(),
                state_class: Some(config.state_class.clone()).filter(|s| !s.is_empty()),
                unit_of_measurement: config.unit_of_measurement.clone(),
                value_template: format!("{{{{ value_json.{} }}}}", sensor.key()),
                unique_id: format!("{}_{}", config.name, info.name),
                state_topic: state_topic.clone(),
                icon: sensor.icon().map(str::to_string),
            };

            if let Some(previous) = components.insert(sensor.key().to_string(), component) {
                return Err(FormatError::KeyCollision {
                    key: sensor.key().to_string(),
                    first: previous.name,
                    second: config.name.clone(),
                });
            }
        }

        Ok(DiscoveryPayload {
            device: DeviceBlock {
                identifiers: vec![info.serial_number.clone()],
                name: info.name.clone(),
                manufacturer: info.manufacturer.clone(),
                model: info.model.clone(),
                serial_number: info.serial_number.clone(),
            },
            origin: OriginBlock {
                name: self.identity.name.clone(),
                sw: self.identity.version.clone(),
                url: self.identity.url.clone(),
            },
            components,
            state_topic,
            qos: DISCOVERY_QOS,
        })
    }

    /// Discovery-config payload as JSON.
    pub fn discovery_config(&self, device: &Device) -> Result<String, FormatError> {
        Ok(serde_json::to_string(&self.discovery_payload(device)?)?)
    }

    /// State payload as JSON: `{ "<key>": <value rounded to 2 decimals>, ... }`.
    ///
    /// Sensors without a current value are omitted. Any stored value that
    /// is not a finite number fails the whole payload.
    pub fn state_values(&self, device: &Device) -> Result<String, FormatError> {
        let mut values = BTreeMap::new();

        for sensor in device.sensors() {
            let Some(raw) = sensor.current_value() else {
                continue;
            };

            // Huge finite readings overflow while rounding, so check afterwards
            let value = raw
                .parse::<f64>()
                .ok()
                .map(round2)
                .filter(|v| v.is_finite())
                .ok_or_else(|| FormatError::NotNumeric {
                    sensor: sensor.name().to_string(),
                    value: raw.to_string(),
                })?;

            values.insert(sensor.key(), value);
        }

        Ok(serde_json::to_string(&values)?)
    }
}

/// Round half away from zero to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a display name to a snake_case payload key.
///
/// Words are split at any non-alphanumeric character, at lower-to-upper
/// transitions, between letters and digits, and before the last capital of
/// an acronym followed by a lowercase letter. Total for any input.
///
/// Keys match the `strcase` snake_case of earlier releases for names made of
/// letters, digits, spaces, `-`, `_` and `.`. Other punctuation is dropped
/// rather than kept, so such names yield different keys.
///
/// # Example
/// ```
/// use homelink_bridge_shell::formatter::snake_case;
///
/// assert_eq!(snake_case("CPU Temp"), "cpu_temp");
/// assert_eq!(snake_case("CPUTemp"), "cpu_temp");
/// assert_eq!(snake_case("diskUsage (%)"), "disk_usage");
/// assert_eq!(snake_case("Sensor1Value"), "sensor_1_value");
/// ```
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut key = String::with_capacity(name.len() + 4);
    let mut separate = false;

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            separate = !key.is_empty();
            continue;
        }

        if !key.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let case_change = c.is_uppercase()
                && (prev.is_lowercase() || (prev.is_uppercase() && next_is_lower));
            let digit_change = (c.is_numeric() && prev.is_alphabetic())
                || (c.is_alphabetic() && prev.is_numeric());
            if case_change || digit_change {
                separate = true;
            }
        }

        if separate {
            key.push('_');
            separate = false;
        }
        key.extend(c.to_lowercase());
    }

    key
}
