//! Exporter installation
//!
//! The agent never talks to a collector itself. An [`ExporterProvider`]
//! receives each OpenTelemetry SDK provider builder and installs whatever
//! exporters it wants before the runtime handle is assembled.

pub mod otlp;

pub use otlp::OtlpExporterProvider;

use crate::config::Configuration;
use crate::error::AgentError;
use opentelemetry_sdk::logs::LoggerProviderBuilder;
use opentelemetry_sdk::metrics::MeterProviderBuilder;
use opentelemetry_sdk::trace::TracerProviderBuilder;
use std::fmt;

/// Installs exporters into the SDK provider builders
///
/// Each method is called once per enabled signal while the runtime handle is
/// built. Returning an error aborts agent construction.
pub trait ExporterProvider: Send + Sync + fmt::Debug {
    /// Install span exporters
    fn install_traces(
        &self,
        builder: TracerProviderBuilder,
        config: &Configuration,
    ) -> Result<TracerProviderBuilder, AgentError>;

    /// Install metric readers
    fn install_metrics(
        &self,
        builder: MeterProviderBuilder,
        config: &Configuration,
    ) -> Result<MeterProviderBuilder, AgentError>;

    /// Install log exporters
    fn install_logs(
        &self,
        builder: LoggerProviderBuilder,
        config: &Configuration,
    ) -> Result<LoggerProviderBuilder, AgentError>;
}
