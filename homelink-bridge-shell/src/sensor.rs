//! Shell-command sensors.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::config::SensorConfig;
use crate::formatter::snake_case;

/// Why a sensor sample failed.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The shell could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran past the configured timeout and was killed.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The command exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Runs sensor commands through a shell.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    shell: String,
    timeout: Option<Duration>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl CommandRunner {
    /// Create a runner using `shell -c <command>`, without timeout.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            timeout: None,
        }
    }

    /// Kill commands that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Run a command and return its whitespace-trimmed standard output.
    pub async fn run(&self, command: &str) -> Result<String, SampleError> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SampleError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| SampleError::Timeout {
                    command: command.to_string(),
                    timeout: limit,
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|source| SampleError::Spawn {
            command: command.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(SampleError::ExitStatus {
                command: command.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// A sensor: its configuration plus the most recent sample.
///
/// Holds a single slot. A failed sample clears the value so a stale
/// reading is never republished.
#[derive(Debug, Clone)]
pub struct Sensor {
    config: SensorConfig,
    key: String,
    value: Option<String>,
    last_error: Option<String>,
}

impl Sensor {
    pub fn new(config: SensorConfig) -> Self {
        let key = snake_case(&config.name);
        Self {
            config,
            key,
            value: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Payload key: the snake_case form of the name.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn command(&self) -> &str {
        &self.config.command
    }

    /// Icon, treating an empty string as absent.
    pub fn icon(&self) -> Option<&str> {
        self.config.icon.as_deref().filter(|icon| !icon.is_empty())
    }

    /// Re-run the command and store its output as the current value.
    ///
    /// On failure the stored value is cleared and the error recorded.
    pub async fn sample(&mut self, runner: &CommandRunner) -> Result<(), SampleError> {
        match runner.run(&self.config.command).await {
            Ok(output) => {
                self.value = Some(output);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.value = None;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// The last successfully sampled value.
    pub fn current_value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The error of the last sample, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(name: &str, command: &str) -> Sensor {
        Sensor::new(SensorConfig::new(name, command))
    }

    #[test]
    fn test_sensor_key_and_icon() {
        let mut config = SensorConfig::new("CPU Temp", "echo 1");
        config.icon = Some(String::new());
        let sensor = Sensor::new(config);

        assert_eq!(sensor.key(), "cpu_temp");
        assert_eq!(sensor.icon(), None);
        assert_eq!(sensor.current_value(), None);
        assert_eq!(sensor.last_error(), None);
    }

    #[tokio::test]
    async fn test_sample_trims_output() {
        let mut sensor = sensor("CPU Temp", "echo '  42.567  '");
        sensor.sample(&CommandRunner::default()).await.unwrap();
        assert_eq!(sensor.current_value(), Some("42.567"));
    }

    #[tokio::test]
    async fn test_sample_failure_clears_value() {
        let runner = CommandRunner::default();
        let mut sensor = sensor("Load", "echo 1.5");
        sensor.sample(&runner).await.unwrap();
        assert_eq!(sensor.current_value(), Some("1.5"));

        let mut failing = Sensor::new(SensorConfig::new("Load", "echo oops >&2; exit 3"));
        failing.value = sensor.value.clone();

        let err = failing.sample(&runner).await.unwrap_err();
        assert!(matches!(err, SampleError::ExitStatus { .. }));
        assert!(err.to_string().contains("oops"));
        assert_eq!(failing.current_value(), None);
        assert!(failing.last_error().is_some());
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let runner = CommandRunner::default();
        let mut sensor = sensor("Flaky", "exit 1");
        assert!(sensor.sample(&runner).await.is_err());
        assert!(sensor.last_error().is_some());

        sensor.config.command = "echo 7".to_string();
        sensor.sample(&runner).await.unwrap();
        assert_eq!(sensor.current_value(), Some("7"));
        assert_eq!(sensor.last_error(), None);
    }

    #[tokio::test]
    async fn test_missing_shell() {
        let runner = CommandRunner::new("/nonexistent/shell");
        let mut sensor = sensor("Any", "echo 1");
        let err = sensor.sample(&runner).await.unwrap_err();
        assert!(matches!(err, SampleError::Spawn { .. }));
        assert_eq!(sensor.current_value(), None);
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let runner = CommandRunner::default().with_timeout(Some(Duration::from_millis(100)));
        let mut sensor = sensor("Slow", "sleep 5; echo 1");
        let err = sensor.sample(&runner).await.unwrap_err();
        assert!(matches!(err, SampleError::Timeout { .. }));
        assert_eq!(sensor.current_value(), None);
    }
}
