//! Error types for the telemetry agent
//!
//! This module defines all error types used throughout the agent. Every
//! failure is returned synchronously to the immediate caller; nothing here is
//! retried internally.

use thiserror::Error;

/// Error type for agent operations
///
/// Configuration and lifecycle mistakes are programmer errors, so each variant
/// carries enough context to point at the offending option or component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// A mandatory option was absent
    ///
    /// Raised when a `Configuration` is finalized without a required option,
    /// or when an agent needs an option the configuration does not carry.
    /// The payload is the option name.
    #[error("Missing required option: {0}")]
    MissingRequiredOptionError(String),

    /// An interceptor in a configuration chain failed
    ///
    /// The chain stops at the failing interceptor and no configuration is
    /// produced.
    #[error("Interceptor failure: {0}")]
    InterceptorFailureError(String),

    /// The runtime handle was requested after the agent was closed
    #[error("Agent is closed")]
    AgentClosedError,

    /// Invalid configuration value
    ///
    /// Occurs when an option is present but malformed (bad endpoint URL,
    /// unknown log level, zero durations) or a config file cannot be read.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Exporter construction failure
    #[error("Exporter error: {0}")]
    ExporterError(String),

    /// Service registration, lookup, start or stop failure
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Flushing buffered telemetry failed
    #[error("Flush failed: {0}")]
    FlushFailed(String),

    /// Releasing the runtime handle failed
    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),
}

impl AgentError {
    /// Check if the error was raised because the agent is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, AgentError::AgentClosedError)
    }

    /// Check if the error names a missing option
    ///
    /// Returns the option name for `MissingRequiredOptionError`.
    pub fn missing_option(&self) -> Option<&str> {
        match self {
            AgentError::MissingRequiredOptionError(option) => Some(option),
            _ => None,
        }
    }
}
