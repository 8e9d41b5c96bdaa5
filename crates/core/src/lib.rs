//! Shared configuration for the courier workspace.
//!
//! Courier has no domain state of its own; everything it needs to run is
//! captured by [`config::AppConfig`]: Slack credentials, the HTTP listen
//! address, and logging preferences.

pub mod config;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
