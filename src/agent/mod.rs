//! Agent lifecycle
//!
//! An [`Agent`] owns one runtime handle and moves through two states:
//! `Open` from construction, `Closed` after the first [`Agent::close`].
//! Closing stops the agent's services and releases the handle exactly once,
//! no matter how many threads call `close` concurrently.

mod builder;

pub use builder::{AgentBuilder, HandleSource};

use crate::config::Configuration;
use crate::error::AgentError;
use crate::runtime::{RuntimeHandle, TelemetryRuntime};
use crate::services::{Lifecycle, Service, ServiceManager};
use crate::utils::logging;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owner of a telemetry runtime handle
///
/// Thread-safe: `handle`, `flush` and `close` take `&self`, so an agent can be
/// shared behind an `Arc`. Dropping an open agent closes it.
pub struct Agent<R: RuntimeHandle = TelemetryRuntime> {
    /// Final configuration (immutable)
    configuration: Arc<Configuration>,
    handle: R,
    /// False for preconstructed handles, which the agent must not shut down
    owns_handle: bool,
    services: ServiceManager,
    closed: AtomicBool,
}

impl Agent<TelemetryRuntime> {
    /// Start building an agent backed by the OpenTelemetry SDK
    pub fn builder() -> AgentBuilder<TelemetryRuntime> {
        AgentBuilder::new()
    }
}

impl<R: RuntimeHandle> Agent<R> {
    /// Build an agent whose handle is derived from `configuration`
    ///
    /// # Errors
    ///
    /// Returns whatever `R::from_configuration` returns, e.g.
    /// `MissingRequiredOptionError("exporter_provider")`.
    pub fn from_configuration(configuration: Configuration) -> Result<Self, AgentError> {
        Self::open(
            configuration,
            HandleSource::DerivedFromConfiguration,
            ServiceManager::new(),
        )
    }

    pub(crate) fn open(
        configuration: Configuration,
        source: HandleSource<R>,
        services: ServiceManager,
    ) -> Result<Self, AgentError> {
        let (handle, owns_handle) = match source {
            HandleSource::DerivedFromConfiguration => (R::from_configuration(&configuration)?, true),
            HandleSource::Preconstructed(handle) => (handle, false),
        };

        if let Err(e) = services.start() {
            if owns_handle {
                if let Err(release) = handle.shutdown() {
                    warn!(error = %release, "Failed to release runtime handle after service start failure");
                }
            }
            return Err(e);
        }

        // process-wide; only once construction can no longer fail
        if configuration.logging().install_subscriber {
            logging::init_tracing(configuration.logging());
        }

        info!(
            service = configuration.service_name(),
            owns_handle,
            services = services.len(),
            "Telemetry agent opened"
        );

        Ok(Self {
            configuration: Arc::new(configuration),
            handle,
            owns_handle,
            services,
            closed: AtomicBool::new(false),
        })
    }

    /// The runtime handle
    ///
    /// # Errors
    ///
    /// Returns `AgentClosedError` once the agent is closed.
    pub fn handle(&self) -> Result<&R, AgentError> {
        if self.is_closed() {
            return Err(AgentError::AgentClosedError);
        }
        Ok(&self.handle)
    }

    /// The configuration the agent was built from, after interception
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Look up one of the agent's services
    pub fn service(&self, name: &str) -> Result<Arc<dyn Service>, AgentError> {
        self.services.get_by_name(name)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns true unless the handle was supplied pre-built
    pub fn owns_handle(&self) -> bool {
        self.owns_handle
    }

    /// Export anything the handle has buffered
    ///
    /// # Errors
    ///
    /// Returns `AgentClosedError` once closed, or the handle's flush error.
    pub fn flush(&self) -> Result<(), AgentError> {
        self.handle()?.force_flush()
    }

    /// Close the agent
    ///
    /// The first call stops services (reverse registration order) and shuts
    /// down an owned handle; its result reports the first failure of those
    /// steps. The agent is closed afterwards either way. Every later call,
    /// including concurrent ones, returns `Ok(())` without doing anything.
    pub fn close(&self) -> Result<(), AgentError> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Agent already closed");
            return Ok(());
        }

        info!(service = self.configuration.service_name(), "Closing telemetry agent");

        let stopped = self.services.stop();
        let released = if self.owns_handle {
            self.handle.shutdown()
        } else {
            debug!("Runtime handle is not owned by the agent; leaving it running");
            Ok(())
        };

        stopped.and(released)
    }
}

impl<R: RuntimeHandle> Drop for Agent<R> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Error closing telemetry agent on drop");
        }
    }
}

impl<R: RuntimeHandle> fmt::Debug for Agent<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("service", &self.configuration.service_name())
            .field("owns_handle", &self.owns_handle)
            .field("services", &self.services)
            .field("closed", &self.is_closed())
            .finish()
    }
}
