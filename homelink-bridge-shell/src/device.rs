//! The device: identity plus its ordered sensors.

use tracing::{debug, warn};

use crate::config::{DeviceConfig, ShellBridgeConfig};
use crate::sensor::{CommandRunner, Sensor};

/// Outcome of sampling every sensor once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport {
    /// Sensors that produced a value.
    pub sampled: usize,
    /// Sensors whose command failed.
    pub failed: usize,
}

impl SampleReport {
    pub fn total(&self) -> usize {
        self.sampled + self.failed
    }
}

/// A device exposing shell-command sensors.
///
/// Identity is fixed at construction. Sensors are appended during startup
/// and kept in insertion order.
#[derive(Debug, Clone)]
pub struct Device {
    info: DeviceConfig,
    sensors: Vec<Sensor>,
}

impl Device {
    pub fn new(info: DeviceConfig) -> Self {
        Self {
            info,
            sensors: Vec::new(),
        }
    }

    /// Build the device and its sensors from the bridge configuration.
    pub fn from_config(config: &ShellBridgeConfig) -> Self {
        let mut device = Self::new(config.device.clone());
        for sensor in &config.sensors {
            device.add_sensor(Sensor::new(sensor.clone()));
        }
        device
    }

    pub fn info(&self) -> &DeviceConfig {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn serial_number(&self) -> &str {
        &self.info.serial_number
    }

    pub fn add_sensor(&mut self, sensor: Sensor) {
        self.sensors.push(sensor);
    }

    /// Sensors in insertion order.
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Sample every sensor in order.
    ///
    /// A failing sensor is logged and left without a value; the others
    /// are still sampled.
    pub async fn sample_all(&mut self, runner: &CommandRunner) -> SampleReport {
        let mut report = SampleReport::default();

        for sensor in &mut self.sensors {
            match sensor.sample(runner).await {
                Ok(()) => {
                    report.sampled += 1;
                    debug!(
                        sensor = %sensor.name(),
                        value = sensor.current_value().unwrap_or_default(),
                        "Sensor read"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(sensor = %sensor.name(), error = %e, "Failed to read sensor");
                }
            }
        }

        report
    }
}
