//! Configuration module for the telemetry agent
//!
//! This module handles the configuration draft, the immutable configuration
//! it finalizes into, and loading drafts from files and the environment.

pub mod loader;
pub mod types;

pub use types::{
    Authentication, Configuration, ConfigurationDraft, ExportSettings, LogFormat,
    LoggingSettings, Protocol, SignalSettings, DEFAULT_EXPORT_TIMEOUT, DEFAULT_LOG_LEVEL,
    DEFAULT_METRIC_INTERVAL,
};
