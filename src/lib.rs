//! Telemetry Agent
//!
//! Composable OpenTelemetry agent configuration with a managed runtime
//! lifecycle. Options accumulate in a mutable draft, are finalized into an
//! immutable `Configuration`, pass through an ordered chain of interceptors,
//! and end up in an `Agent` that owns the telemetry runtime and releases it
//! exactly once.
//!
//! # Features
//!
//! - Immutable configuration snapshots with explicit finalization
//! - Ordered, fail-fast configuration interceptors
//! - OTLP export over gRPC or HTTP with header and credential support
//! - Idempotent, thread-safe agent shutdown
//! - Pre-built runtime handles for tests, through the same builder path
//! - Named services started and stopped with the agent
//! - YAML and environment configuration loading
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use telemetry_agent::{Agent, AgentError, Configuration, OtlpExporterProvider};
//!
//! # fn main() -> Result<(), AgentError> {
//! let agent = Agent::builder()
//!     .configure(|draft| {
//!         draft
//!             .with_service_name("checkout")
//!             .with_service_version("1.4.2")
//!             .with_export_endpoint("http://collector:4317")
//!     })
//!     .with_exporter_provider(Arc::new(OtlpExporterProvider::new()))
//!     .add_configuration_interceptor(|config: Configuration| {
//!         let timeout = config.export().timeout;
//!         config.amend(|draft| draft.with_export_timeout(timeout * 2))
//!     })
//!     .build()?;
//!
//! assert_eq!(agent.configuration().export().timeout, Duration::from_secs(20));
//!
//! let _meter = agent.handle()?.meter("checkout");
//! agent.close()?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod exporters;
pub mod interceptor;
pub mod runtime;
pub mod services;
pub mod utils;

pub use agent::{Agent, AgentBuilder, HandleSource};
pub use config::{Configuration, ConfigurationDraft, ExportSettings, LogFormat, Protocol};
pub use error::AgentError;
pub use exporters::{ExporterProvider, OtlpExporterProvider};
pub use interceptor::{composite, Composite, Interceptor};
pub use runtime::{RuntimeHandle, TelemetryRuntime};
pub use services::{Lifecycle, Service, ServiceManager};
