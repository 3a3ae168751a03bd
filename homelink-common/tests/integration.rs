//! Integration tests for homelink-common library.

use homelink_common::{
    LoggingConfig, MqttConfig, SoftwareIdentity, TopicBuilder, topic_matches,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BrokerSection {
    mqtt_server: MqttConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
fn test_topics_for_default_identity() {
    let identity = SoftwareIdentity::default();
    let topics = TopicBuilder::new(&identity.name);

    let config_topic = topics.config_topic("ABC123");
    let state_topic = topics.state_topic("ABC123");

    assert_eq!(
        config_topic,
        "homeassistant/device/PenguinHomeLink/ABC123/config"
    );
    assert_eq!(state_topic, "PenguinHomeLink/ABC123/state");

    // A subscriber watching every device's state sees this device
    assert!(topic_matches("PenguinHomeLink/+/state", &state_topic));
    // The hub's discovery wildcard sees the config topic
    assert!(topic_matches("homeassistant/#", &config_topic));
    assert!(!topic_matches("homeassistant/#", &state_topic));
}

#[test]
fn test_broker_section_from_json5() {
    let content = r#"
    {
        // Broker settings as written by users
        mqtt_server: {
            ip: "10.0.0.2",
            port: 1883,
            username: "penguin",
            password: "hunter2",
            client_id: "penguin-lab",
        },
    }
    "#;

    let section: BrokerSection = json5::from_str(content).expect("Parse failed");

    assert_eq!(section.mqtt_server.address(), "10.0.0.2:1883");
    assert_eq!(section.mqtt_server.client_id.as_deref(), Some("penguin-lab"));
    assert_eq!(section.logging.level, "info");
}
