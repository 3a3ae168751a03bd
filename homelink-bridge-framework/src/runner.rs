//! Bridge runner for lifecycle management.

use std::future::Future;

use tokio::signal;

use homelink_common::{LoggingConfig, init_tracing};

use crate::BridgeArgs;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::session::BrokerSession;

/// Bridge runner that manages the lifecycle of a bridge.
///
/// Handles:
/// - Logging initialization
/// - Broker session construction
/// - Running the bridge worker until Ctrl+C
///
/// # Example
///
/// ```ignore
/// use homelink_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let args = BridgeArgs::parse_with_default("mybridge.json5");
///     let config = MyBridgeConfig::load(&args.config)?;
///
///     let runner = BridgeRunner::new_with_args("mybridge", config, Some(&args))?;
///     let mut worker = MyWorker::new(runner.session("mybridge-client"));
///
///     runner.run_until_shutdown(worker.run()).await?;
///     worker.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct BridgeRunner<C: BridgeConfig> {
    /// Bridge name for logging.
    name: String,
    /// Bridge version.
    version: String,
    /// The loaded configuration.
    config: C,
}

impl<C: BridgeConfig> BridgeRunner<C> {
    /// Create a new bridge runner, initializing logging from the config.
    pub fn new(name: impl Into<String>, config: C) -> Result<Self> {
        Self::new_with_args(name, config, None)
    }

    /// Create a new bridge runner with CLI args for log level override.
    pub fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&BridgeArgs>,
    ) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        // Initialize logging with optional CLI override
        let log_config = match args.and_then(|a| a.log_level.as_ref()) {
            Some(level) => LoggingConfig {
                level: level.clone(),
                ..config.logging().clone()
            },
            None => config.logging().clone(),
        };

        init_tracing(&log_config)?;

        tracing::info!(bridge = %name, version = %version, "Starting bridge");

        Ok(Self {
            name,
            version,
            config,
        })
    }

    /// Get the bridge name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the bridge version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Build a disconnected broker session from the configuration.
    ///
    /// `client_id` applies when the configuration does not set one.
    pub fn session(&self, client_id: impl Into<String>) -> BrokerSession {
        BrokerSession::new(self.config.mqtt().clone(), client_id)
    }

    /// Drive `work` until Ctrl+C is received or it completes.
    ///
    /// The work future is dropped on shutdown, which releases any borrow
    /// it holds so the caller can clean up afterwards.
    pub async fn run_until_shutdown<F>(&self, work: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(bridge = %self.name, "Bridge running. Press Ctrl+C to stop.");

        tokio::select! {
            _ = work => {
                tracing::warn!(bridge = %self.name, "Bridge worker stopped");
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => tracing::info!(bridge = %self.name, "Received shutdown signal"),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                        return Err(BridgeError::Io(e));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use homelink_common::MqttConfig;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        mqtt_server: MqttConfig,
        #[serde(default)]
        logging: LoggingConfig,
    }

    impl BridgeConfig for TestConfig {
        fn mqtt(&self) -> &MqttConfig {
            &self.mqtt_server
        }

        fn logging(&self) -> &LoggingConfig {
            &self.logging
        }
    }

    // Built directly: `new` installs the global subscriber, which can only
    // happen once per test process.
    fn runner() -> BridgeRunner<TestConfig> {
        BridgeRunner {
            name: "test".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: TestConfig::parse(r#"{ mqtt_server: { ip: "127.0.0.1" } }"#).unwrap(),
        }
    }

    #[test]
    fn test_session_uses_bridge_config() {
        let runner = runner();
        let session = runner.session("penguinhomelink-ABC123");

        assert!(!session.is_connected());
        assert_eq!(session.client_id(), "penguinhomelink-ABC123");
        assert_eq!(session.config().address(), "127.0.0.1:1883");
        assert_eq!(runner.name(), "test");
    }

    #[tokio::test]
    async fn test_run_until_shutdown_returns_when_work_ends() {
        let runner = runner();
        let mut ran = false;
        runner
            .run_until_shutdown(async {
                ran = true;
            })
            .await
            .unwrap();
        assert!(ran);
    }
}
