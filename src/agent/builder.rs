//! Agent builder
//!
//! Accumulates a `ConfigurationDraft`, the configuration interceptors and the
//! handle source, then assembles an [`Agent`] in one step:
//! snapshot the draft, run the interceptors in registration order, build or
//! adopt the runtime handle.

use super::Agent;
use crate::config::{Configuration, ConfigurationDraft};
use crate::error::AgentError;
use crate::exporters::ExporterProvider;
use crate::interceptor::{composite, Interceptor};
use crate::runtime::{RuntimeHandle, TelemetryRuntime};
use crate::services::{Service, ServiceManager};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Where the agent's runtime handle comes from
pub enum HandleSource<R> {
    /// Build the handle from the final configuration; the agent owns it and
    /// shuts it down on close
    DerivedFromConfiguration,
    /// Use a handle built elsewhere; the agent never shuts it down
    Preconstructed(R),
}

impl<R> Default for HandleSource<R> {
    fn default() -> Self {
        HandleSource::DerivedFromConfiguration
    }
}

impl<R> fmt::Debug for HandleSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleSource::DerivedFromConfiguration => f.write_str("DerivedFromConfiguration"),
            HandleSource::Preconstructed(_) => f.write_str("Preconstructed"),
        }
    }
}

/// Builder for [`Agent`]
///
/// Setters never fail; every validation error surfaces from [`build`](Self::build).
/// `build` consumes the builder, so one builder produces at most one agent.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use telemetry_agent::{Agent, AgentError, Configuration, OtlpExporterProvider};
///
/// # fn main() -> Result<(), AgentError> {
/// let agent = Agent::builder()
///     .configure(|draft| {
///         draft
///             .with_service_name("checkout")
///             .with_export_endpoint("http://collector:4317")
///     })
///     .with_exporter_provider(Arc::new(OtlpExporterProvider::new()))
///     .add_configuration_interceptor(|config: Configuration| {
///         config.amend(|draft| draft.with_deployment_environment("production"))
///     })
///     .build()?;
///
/// let runtime = agent.handle()?;
/// # let _ = runtime;
/// agent.close()?;
/// # Ok(())
/// # }
/// ```
pub struct AgentBuilder<R: RuntimeHandle = TelemetryRuntime> {
    draft: ConfigurationDraft,
    configuration_interceptors: Vec<Arc<dyn Interceptor<Configuration>>>,
    handle_source: HandleSource<R>,
    services: Vec<Arc<dyn Service>>,
}

impl<R: RuntimeHandle> AgentBuilder<R> {
    /// Create a builder with an empty draft
    pub fn new() -> Self {
        Self::from_draft(ConfigurationDraft::new())
    }

    /// Create a builder seeded with `draft`, e.g. one produced by the loader
    pub fn from_draft(draft: ConfigurationDraft) -> Self {
        Self {
            draft,
            configuration_interceptors: Vec::new(),
            handle_source: HandleSource::default(),
            services: Vec::new(),
        }
    }

    /// Edit the configuration draft
    pub fn configure<F>(mut self, edit: F) -> Self
    where
        F: FnOnce(ConfigurationDraft) -> ConfigurationDraft,
    {
        self.draft = edit(self.draft);
        self
    }

    /// Set the exporter provider
    pub fn with_exporter_provider(mut self, provider: Arc<dyn ExporterProvider>) -> Self {
        self.draft = self.draft.with_exporter_provider(provider);
        self
    }

    /// Register an interceptor applied to the configuration snapshot
    ///
    /// Interceptors run after the draft is finalized, in registration order,
    /// so they override whatever the draft set.
    pub fn add_configuration_interceptor<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor<Configuration> + 'static,
    {
        self.configuration_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Use a pre-built runtime handle instead of deriving one
    ///
    /// The agent still runs the full configuration pipeline and the
    /// Open/Closed lifecycle, but leaves the handle running on close.
    pub fn with_preconstructed_handle(mut self, handle: R) -> Self {
        self.handle_source = HandleSource::Preconstructed(handle);
        self
    }

    pub fn with_handle_source(mut self, source: HandleSource<R>) -> Self {
        self.handle_source = source;
        self
    }

    /// Register a service started with the agent and stopped on close
    ///
    /// Duplicate names are reported by `build`.
    pub fn with_service(mut self, service: Arc<dyn Service>) -> Self {
        self.services.push(service);
        self
    }

    /// The draft as accumulated so far
    pub fn draft(&self) -> &ConfigurationDraft {
        &self.draft
    }

    pub fn interceptor_count(&self) -> usize {
        self.configuration_interceptors.len()
    }

    /// Snapshot the draft into a `Configuration`
    ///
    /// Registered interceptors are not applied here.
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredOptionError` or `ConfigurationError` from
    /// [`ConfigurationDraft::finalize`].
    pub fn build_configuration(&self) -> Result<Configuration, AgentError> {
        self.draft.clone().finalize()
    }

    /// Build the agent
    ///
    /// # Errors
    ///
    /// Returns the first error of, in order: finalizing the draft, any
    /// interceptor, service registration, runtime handle construction,
    /// service start.
    pub fn build(self) -> Result<Agent<R>, AgentError> {
        let snapshot = self.build_configuration()?;

        let interceptors = composite(self.configuration_interceptors);
        debug!(interceptors = interceptors.len(), "Applying configuration interceptors");
        let configuration = interceptors.intercept(snapshot)?;

        let mut services = ServiceManager::new();
        for service in self.services {
            services.add_service(service)?;
        }

        Agent::open(configuration, self.handle_source, services)
    }
}

impl<R: RuntimeHandle> Default for AgentBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RuntimeHandle> fmt::Debug for AgentBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentBuilder")
            .field("draft", &self.draft)
            .field("interceptors", &self.configuration_interceptors.len())
            .field("handle_source", &self.handle_source)
            .field("services", &self.services.len())
            .finish()
    }
}
