//! The polling loop: connect, announce, sample, publish, sleep.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{error, info};

use homelink_bridge_framework::Broker;

use crate::device::Device;
use crate::formatter::PayloadFormatter;
use crate::sensor::CommandRunner;

/// The discovery config is re-announced once more than this has elapsed.
pub const DISCOVERY_RESEND_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Pause after a failed iteration.
pub const RETRY_PAUSE: Duration = Duration::from_secs(30);

/// Drives one device over one broker connection.
///
/// Only one loop may run per device and broker: the loop is the sole
/// mutator of sensor state and of the last-announcement timestamp.
pub struct PublishLoop<B: Broker> {
    device: Device,
    broker: B,
    formatter: PayloadFormatter,
    runner: CommandRunner,
    poll_interval: Duration,
    discovery_period: Duration,
    retry_pause: Duration,
    /// When the discovery config was last published; `None` until the first one.
    last_discovery: Option<Instant>,
}

impl<B: Broker> PublishLoop<B> {
    pub fn new(
        device: Device,
        broker: B,
        formatter: PayloadFormatter,
        poll_interval: Duration,
    ) -> Self {
        Self {
            device,
            broker,
            formatter,
            runner: CommandRunner::default(),
            poll_interval,
            discovery_period: DISCOVERY_RESEND_PERIOD,
            retry_pause: RETRY_PAUSE,
            last_discovery: None,
        }
    }

    /// Set the runner used for sensor commands.
    pub fn with_runner(mut self, runner: CommandRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_discovery_period(mut self, period: Duration) -> Self {
        self.discovery_period = period;
        self
    }

    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    fn discovery_due(&self) -> bool {
        self.last_discovery
            .is_none_or(|sent| sent.elapsed() > self.discovery_period)
    }

    /// Run one iteration.
    ///
    /// Sensor failures are absorbed; any connect, format or publish
    /// failure ends the iteration with an error.
    pub async fn run_once(&mut self) -> Result<()> {
        if !self.broker.is_connected() {
            info!("Connecting to MQTT broker");
        }
        self.broker
            .connect()
            .await
            .context("failed to connect to MQTT broker")?;

        if self.discovery_due() {
            let topic = self.formatter.config_topic(&self.device);
            let payload = self
                .formatter
                .discovery_config(&self.device)
                .context("failed to build discovery config")?;

            self.broker
                .publish(&topic, payload)
                .await
                .with_context(|| format!("failed to publish discovery config to '{}'", topic))?;

            self.last_discovery = Some(Instant::now());
            info!(topic = %topic, "Discovery config sent");
        }

        let report = self.device.sample_all(&self.runner).await;
        info!(
            sampled = report.sampled,
            failed = report.failed,
            "Sensor values read"
        );

        let topic = self.formatter.state_topic(&self.device);
        let payload = self
            .formatter
            .state_values(&self.device)
            .context("failed to build state payload")?;

        self.broker
            .publish(&topic, payload)
            .await
            .with_context(|| format!("failed to publish state to '{}'", topic))?;

        info!(topic = %topic, "Sensor values sent");
        Ok(())
    }

    /// Run one iteration and return how long to wait before the next.
    pub async fn tick(&mut self) -> Duration {
        match self.run_once().await {
            Ok(()) => self.poll_interval,
            Err(e) => {
                error!(
                    error = %format!("{:#}", e),
                    pause = ?self.retry_pause,
                    "Iteration failed, recovered, pausing"
                );
                self.retry_pause
            }
        }
    }

    /// Loop forever. Terminates only when the future is dropped.
    pub async fn run(&mut self) {
        info!(
            device = %self.device.name(),
            serial = %self.device.serial_number(),
            sensors = self.device.sensors().len(),
            interval = ?self.poll_interval,
            "Starting publish loop"
        );

        loop {
            let pause = self.tick().await;
            tokio::time::sleep(pause).await;
        }
    }

    /// Disconnect from the broker.
    pub async fn shutdown(&mut self) {
        self.broker.disconnect().await;
    }
}
