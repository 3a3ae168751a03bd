//! PenguinHomeLink Bridge Framework
//!
//! Common abstractions for building bridges that publish telemetry to an MQTT broker.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`BridgeRunner`] for managing bridge lifecycle (logging, shutdown, signal handling)
//! - [`BrokerSession`] for the MQTT connection (connect, publish, subscribe, reconnect)
//! - [`Broker`] trait that publishing workers are generic over
//! - [`BridgeArgs`] for common CLI argument parsing
//!
//! # Example
//!
//! ```ignore
//! use homelink_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = BridgeArgs::parse_with_default("mybridge.json5");
//!     let config = MyBridgeConfig::load(&args.config)?;
//!
//!     let runner = BridgeRunner::new_with_args("mybridge", config, Some(&args))?;
//!     let session = runner.session("mybridge");
//!
//!     // Run until Ctrl+C
//!     runner.run_until_shutdown(my_worker(session)).await?;
//!     Ok(())
//! }
//! ```

mod args;
mod broker;
mod config;
mod error;
mod runner;
mod session;

pub use args::BridgeArgs;
pub use broker::Broker;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use runner::BridgeRunner;
pub use session::{BrokerSession, DISCONNECT_GRACE, MessageHandler};

// Re-export commonly used types from homelink-common
pub use homelink_common::{
    LogFormat, LoggingConfig, MqttConfig, SoftwareIdentity, TopicBuilder,
};
