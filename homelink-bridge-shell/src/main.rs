//! MQTT bridge for shell-command sensors.
//!
//! Runs the configured sensor commands on a fixed period and publishes
//! their readings with home-automation discovery.

use anyhow::Result;
use homelink_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner, SoftwareIdentity};

use homelink_bridge_shell::config::ShellBridgeConfig;
use homelink_bridge_shell::device::Device;
use homelink_bridge_shell::formatter::PayloadFormatter;
use homelink_bridge_shell::publish_loop::PublishLoop;
use homelink_bridge_shell::sensor::CommandRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = BridgeArgs::parse_with_default("homelink.json5");

    // Load configuration using the framework's BridgeConfig trait
    let config = ShellBridgeConfig::load(&args.config)?;

    // Create the bridge runner (initializes logging)
    let runner = BridgeRunner::new_with_args("shell", config, Some(&args))?;
    let config = runner.config();

    let identity = SoftwareIdentity::default();
    let device = Device::from_config(config);
    let session = runner.session(config.default_client_id(&identity.name));
    let formatter =
        PayloadFormatter::with_discovery_prefix(identity, &config.software.discovery_prefix);
    let command_runner = CommandRunner::new(&config.software.shell)
        .with_timeout(config.software.command_timeout());

    tracing::info!(
        device = %device.name(),
        serial = %device.serial_number(),
        broker = %config.mqtt_server.address(),
        interval_secs = config.software.refresh_period_s,
        "Shell bridge running"
    );

    let mut publish_loop = PublishLoop::new(
        device,
        session,
        formatter,
        config.software.refresh_period(),
    )
    .with_runner(command_runner);

    // Run until Ctrl+C, then close the broker connection
    runner.run_until_shutdown(publish_loop.run()).await?;
    publish_loop.shutdown().await;

    tracing::info!("Goodbye!");
    Ok(())
}
