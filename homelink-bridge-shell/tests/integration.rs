//! Integration tests for homelink-bridge-shell.

use homelink_bridge_framework::{BridgeConfig, BridgeError, SoftwareIdentity};
use homelink_bridge_shell::config::ShellBridgeConfig;
use homelink_bridge_shell::device::Device;
use homelink_bridge_shell::formatter::{DiscoveryPayload, PayloadFormatter};
use homelink_bridge_shell::sensor::CommandRunner;

const CONFIG: &str = r#"{
    software: { refresh_period_s: 5 },
    device: {
        name: "nas",
        manufacturer: "Penguin",
        model: "NAS-1",
        serial_number: "ABC123",
    },
    mqtt_server: { ip: "127.0.0.1", port: 1883 },
    sensors: [
        {
            name: "CPU Temp",
            command: "echo 42.567",
            device_class: "temperature",
            unit_of_measurement: "°C",
            icon: "mdi:thermometer",
        },
        { name: "Broken Sensor", command: "exit 4" },
    ],
}"#;

/// Config file through to both published payloads.
#[tokio::test]
async fn test_config_to_payloads() {
    let config = ShellBridgeConfig::parse(CONFIG).expect("Config should parse");
    let mut device = Device::from_config(&config);
    let formatter = PayloadFormatter::new(SoftwareIdentity::default());

    let report = device.sample_all(&CommandRunner::default()).await;
    assert_eq!(report.sampled, 1);
    assert_eq!(report.failed, 1);

    assert_eq!(
        formatter.config_topic(&device),
        "homeassistant/device/PenguinHomeLink/ABC123/config"
    );
    assert_eq!(formatter.state_topic(&device), "PenguinHomeLink/ABC123/state");
    assert_eq!(
        formatter.state_values(&device).unwrap(),
        r#"{"cpu_temp":42.57}"#
    );
}

/// The discovery payload parses back into the identity and sensors it was built from.
#[test]
fn test_discovery_payload_recovers_device() {
    let config = ShellBridgeConfig::parse(CONFIG).unwrap();
    let device = Device::from_config(&config);
    let formatter = PayloadFormatter::new(SoftwareIdentity::default());

    let json = formatter.discovery_config(&device).unwrap();
    let payload: DiscoveryPayload = serde_json::from_str(&json).unwrap();

    assert_eq!(payload.device.serial_number, "ABC123");
    assert_eq!(payload.device.identifiers, vec!["ABC123".to_string()]);
    assert_eq!(payload.device.name, config.device.name);
    assert_eq!(payload.device.manufacturer, config.device.manufacturer);
    assert_eq!(payload.device.model, config.device.model);
    assert_eq!(payload.qos, 1);

    let keys: Vec<&str> = payload.components.keys().map(String::as_str).collect();
    assert_eq!(keys, ["broken_sensor", "cpu_temp"]);

    let cpu = &payload.components["cpu_temp"];
    assert_eq!(cpu.name, "CPU Temp");
    assert_eq!(cpu.unique_id, "CPU Temp_nas");
    assert_eq!(cpu.value_template, "{{ value_json.cpu_temp }}");
    assert_eq!(cpu.device_class, "temperature");
    assert_eq!(cpu.unit_of_measurement, "°C");
    assert_eq!(cpu.icon.as_deref(), Some("mdi:thermometer"));
    assert_eq!(cpu.state_topic, "PenguinHomeLink/ABC123/state");

    // Same device, same bytes
    assert_eq!(formatter.discovery_config(&device).unwrap(), json);
}

/// Colliding sensor keys are rejected when the config is loaded.
#[test]
fn test_colliding_sensors_rejected_at_load() {
    let json = r#"{
        device: { name: "nas", serial_number: "ABC123" },
        mqtt_server: { ip: "127.0.0.1" },
        sensors: [
            { name: "CPU Temp", command: "echo 1" },
            { name: "cpu_temp", command: "echo 2" },
        ],
    }"#;

    let err = ShellBridgeConfig::parse(json).unwrap_err();
    assert!(matches!(err, BridgeError::ConfigValidation(_)));
}

/// A custom discovery prefix changes only the config topic.
#[test]
fn test_custom_discovery_prefix() {
    let config = ShellBridgeConfig::parse(CONFIG).unwrap();
    let device = Device::from_config(&config);
    let formatter = PayloadFormatter::with_discovery_prefix(SoftwareIdentity::default(), "ha");

    assert_eq!(
        formatter.config_topic(&device),
        "ha/device/PenguinHomeLink/ABC123/config"
    );
    assert_eq!(formatter.state_topic(&device), "PenguinHomeLink/ABC123/state");
}

#[test]
fn test_missing_config_file() {
    let err = ShellBridgeConfig::load("/nonexistent/homelink.json5").unwrap_err();
    assert!(matches!(err, BridgeError::ConfigNotFound { .. }));
}
