/// Default discovery prefix watched by the home-automation hub.
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Builder for the MQTT topics a bridge publishes to.
///
/// Topics follow the patterns:
/// - `<discovery_prefix>/device/<software>/<serial>/config` for discovery
/// - `<software>/<serial>/state` for sensor values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBuilder {
    discovery_prefix: String,
    software_name: String,
}

impl TopicBuilder {
    /// Create a topic builder using the default discovery prefix.
    pub fn new(software_name: impl Into<String>) -> Self {
        Self {
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
            software_name: software_name.into(),
        }
    }

    /// Create a builder with a custom discovery prefix.
    pub fn with_discovery_prefix(
        discovery_prefix: impl Into<String>,
        software_name: impl Into<String>,
    ) -> Self {
        Self {
            discovery_prefix: discovery_prefix.into(),
            software_name: software_name.into(),
        }
    }

    /// Build the device discovery-config topic.
    ///
    /// # Example
    /// ```
    /// use homelink_common::topic::TopicBuilder;
    ///
    /// let topics = TopicBuilder::new("PenguinHomeLink");
    /// assert_eq!(
    ///     topics.config_topic("ABC123"),
    ///     "homeassistant/device/PenguinHomeLink/ABC123/config"
    /// );
    /// ```
    pub fn config_topic(&self, serial: &str) -> String {
        format!(
            "{}/device/{}/{}/config",
            self.discovery_prefix, self.software_name, serial
        )
    }

    /// Build the device state topic.
    ///
    /// # Example
    /// ```
    /// use homelink_common::topic::TopicBuilder;
    ///
    /// let topics = TopicBuilder::new("PenguinHomeLink");
    /// assert_eq!(topics.state_topic("ABC123"), "PenguinHomeLink/ABC123/state");
    /// ```
    pub fn state_topic(&self, serial: &str) -> String {
        format!("{}/{}/state", self.software_name, serial)
    }

    pub fn discovery_prefix(&self) -> &str {
        &self.discovery_prefix
    }

    pub fn software_name(&self) -> &str {
        &self.software_name
    }
}

/// Check whether a string can be used as a single topic level.
///
/// Rejects empty strings, level separators and wildcard characters.
pub fn is_valid_topic_level(level: &str) -> bool {
    !level.is_empty() && !level.contains(['/', '+', '#'])
}

/// Match a topic name against an MQTT subscription filter.
///
/// Supports the single-level (`+`) and multi-level (`#`) wildcards.
///
/// # Example
/// ```
/// use homelink_common::topic::topic_matches;
///
/// assert!(topic_matches("PenguinHomeLink/+/state", "PenguinHomeLink/ABC123/state"));
/// assert!(topic_matches("homeassistant/#", "homeassistant/status"));
/// assert!(!topic_matches("PenguinHomeLink/+", "PenguinHomeLink/ABC123/state"));
/// ```
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
