//! Named services bound to the agent lifecycle
//!
//! Services are started once the agent's runtime handle exists and stopped
//! when the agent closes, before the handle is released.

use crate::error::AgentError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something that can be started and stopped
pub trait Lifecycle {
    fn start(&self) -> Result<(), AgentError>;

    fn stop(&self) -> Result<(), AgentError>;
}

/// A named unit of work owned by the agent
///
/// Implementations use interior mutability; the agent only holds shared
/// references.
pub trait Service: Send + Sync {
    /// Unique name within one agent
    fn name(&self) -> &str;

    fn start(&self) -> Result<(), AgentError>;

    fn stop(&self) -> Result<(), AgentError>;
}

/// Registry of services keyed by name
///
/// Services start in registration order and stop in reverse order.
#[derive(Default, Clone)]
pub struct ServiceManager {
    services: Vec<Arc<dyn Service>>,
}

impl ServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if a service with the same name is registered.
    pub fn add_service(&mut self, service: Arc<dyn Service>) -> Result<(), AgentError> {
        let name = service.name();
        if self.contains(name) {
            return Err(AgentError::ServiceError(format!(
                "Service already registered with name: {}",
                name
            )));
        }
        self.services.push(service);
        Ok(())
    }

    /// Look up a service by name
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if no service has that name.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn Service>, AgentError> {
        self.services
            .iter()
            .find(|service| service.name() == name)
            .cloned()
            .ok_or_else(|| AgentError::ServiceError(format!("Service not found: {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.iter().any(|service| service.name() == name)
    }

    /// Registered names in start order
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|service| service.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn stop_all(services: &[Arc<dyn Service>]) -> Result<(), AgentError> {
        let mut first_error = None;
        for service in services.iter().rev() {
            match service.stop() {
                Ok(()) => debug!(service = service.name(), "Service stopped"),
                Err(e) => {
                    warn!(service = service.name(), error = %e, "Failed to stop service");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Lifecycle for ServiceManager {
    /// Start every service in registration order
    ///
    /// If one fails, the services already started are stopped again and the
    /// start error is returned.
    fn start(&self) -> Result<(), AgentError> {
        for (index, service) in self.services.iter().enumerate() {
            if let Err(e) = service.start() {
                warn!(service = service.name(), error = %e, "Failed to start service");
                let _ = Self::stop_all(&self.services[..index]);
                return Err(e);
            }
            debug!(service = service.name(), "Service started");
        }
        Ok(())
    }

    /// Stop every service in reverse order
    ///
    /// All services are asked to stop; the first failure is returned.
    fn stop(&self) -> Result<(), AgentError> {
        Self::stop_all(&self.services)
    }
}

impl fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceManager")
            .field("services", &self.names())
            .finish()
    }
}
