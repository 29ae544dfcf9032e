//! Runtime handles
//!
//! A runtime handle is the object that actually produces telemetry. The agent
//! only needs to build one from a `Configuration`, flush it, and release it
//! once; [`TelemetryRuntime`] is the OpenTelemetry SDK implementation.

pub mod resource;

use crate::config::Configuration;
use crate::error::AgentError;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::debug;

/// Capability the agent requires from its runtime handle
pub trait RuntimeHandle: Send + Sync + 'static {
    /// Build a handle from a finalized configuration
    ///
    /// # Errors
    ///
    /// Any error aborts agent construction and is returned to the caller.
    fn from_configuration(config: &Configuration) -> Result<Self, AgentError>
    where
        Self: Sized;

    /// Export anything buffered
    fn force_flush(&self) -> Result<(), AgentError>;

    /// Release every resource held by the handle
    ///
    /// The agent calls this at most once, and only for handles it built.
    fn shutdown(&self) -> Result<(), AgentError>;
}

/// OpenTelemetry SDK providers sharing one resource
///
/// Cloning is cheap; clones share the underlying providers.
#[derive(Debug, Clone)]
pub struct TelemetryRuntime {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: SdkLoggerProvider,
    resource: Resource,
}

impl TelemetryRuntime {
    /// Assemble a runtime from providers built elsewhere
    ///
    /// Used to hand an agent a pre-built handle, typically one wired to
    /// in-memory exporters in tests.
    pub fn from_parts(
        tracer_provider: SdkTracerProvider,
        meter_provider: SdkMeterProvider,
        logger_provider: SdkLoggerProvider,
        resource: Resource,
    ) -> Self {
        Self {
            tracer_provider,
            meter_provider,
            logger_provider,
            resource,
        }
    }

    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger_provider
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Tracer from this runtime's tracer provider
    pub fn tracer(&self, name: &'static str) -> SdkTracer {
        self.tracer_provider.tracer(name)
    }

    /// Meter from this runtime's meter provider
    pub fn meter(&self, name: &'static str) -> Meter {
        self.meter_provider.meter(name)
    }
}

impl RuntimeHandle for TelemetryRuntime {
    fn from_configuration(config: &Configuration) -> Result<Self, AgentError> {
        let exporters = config.exporter_provider().ok_or_else(|| {
            AgentError::MissingRequiredOptionError("exporter_provider".to_string())
        })?;

        let resource = resource::build_resource(config);
        let signals = config.signals();

        let mut traces = SdkTracerProvider::builder().with_resource(resource.clone());
        if signals.traces {
            traces = exporters.install_traces(traces, config)?;
        }

        let mut metrics = SdkMeterProvider::builder().with_resource(resource.clone());
        if signals.metrics {
            metrics = exporters.install_metrics(metrics, config)?;
        }

        let mut logs = SdkLoggerProvider::builder().with_resource(resource.clone());
        if signals.logs {
            logs = exporters.install_logs(logs, config)?;
        }

        debug!(
            service = config.service_name(),
            traces = signals.traces,
            metrics = signals.metrics,
            logs = signals.logs,
            "Built telemetry runtime"
        );

        Ok(Self::from_parts(
            traces.build(),
            metrics.build(),
            logs.build(),
            resource,
        ))
    }

    fn force_flush(&self) -> Result<(), AgentError> {
        let results = [
            self.tracer_provider
                .force_flush()
                .map_err(|e| format!("tracer provider: {}", e)),
            self.meter_provider
                .force_flush()
                .map_err(|e| format!("meter provider: {}", e)),
            self.logger_provider
                .force_flush()
                .map_err(|e| format!("logger provider: {}", e)),
        ];
        first_error(results).map_err(AgentError::FlushFailed)
    }

    /// Flush and shut down all three providers
    ///
    /// Every provider is shut down even if an earlier one fails; the first
    /// failure is reported.
    fn shutdown(&self) -> Result<(), AgentError> {
        let flushed = self.force_flush();
        let results = [
            self.tracer_provider
                .shutdown()
                .map_err(|e| format!("tracer provider: {}", e)),
            self.meter_provider
                .shutdown()
                .map_err(|e| format!("meter provider: {}", e)),
            self.logger_provider
                .shutdown()
                .map_err(|e| format!("logger provider: {}", e)),
        ];
        flushed?;
        first_error(results).map_err(AgentError::ShutdownFailed)
    }
}

fn first_error(results: [Result<(), String>; 3]) -> Result<(), String> {
    results.into_iter().collect()
}
