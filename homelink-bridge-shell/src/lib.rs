//! MQTT bridge for shell-command sensors.
//!
//! Each configured sensor is a shell command whose trimmed standard output
//! is a number. The bridge announces the device and its sensors through
//! home-automation MQTT discovery, then publishes the readings on every
//! poll.
//!
//! # Topics
//!
//! ```text
//! homeassistant/device/PenguinHomeLink/<serial>/config   discovery config
//! PenguinHomeLink/<serial>/state                        {"<sensor_key>": <value>, ...}
//! ```

pub mod config;
pub mod device;
pub mod formatter;
pub mod publish_loop;
pub mod sensor;
