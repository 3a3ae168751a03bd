use serde::{Deserialize, Serialize};

/// Name the bridge announces itself under in topics and discovery payloads.
pub const SOFTWARE_NAME: &str = "PenguinHomeLink";

/// Project URL advertised in the discovery origin block.
pub const SOFTWARE_URL: &str = "https://github.com/LouvAndTech/PenguinHomeLink";

/// Identity of the publishing software.
///
/// Passed explicitly to whatever builds topics or payloads, so tests can
/// use their own identity without touching process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareIdentity {
    /// Software name, also the first level of the state topic.
    pub name: String,
    /// Software version reported to the automation hub.
    pub version: String,
    /// Project URL.
    pub url: String,
}

impl SoftwareIdentity {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: url.into(),
        }
    }
}

impl Default for SoftwareIdentity {
    fn default() -> Self {
        Self::new(SOFTWARE_NAME, env!("CARGO_PKG_VERSION"), SOFTWARE_URL)
    }
}
