//! Common test utilities and fakes
//!
//! This module provides shared test infrastructure for all test modules.

#![allow(dead_code)]

use opentelemetry_sdk::logs::{InMemoryLogExporter, LoggerProviderBuilder};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, MeterProviderBuilder, PeriodicReader};
use opentelemetry_sdk::trace::{InMemorySpanExporter, TracerProviderBuilder};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use telemetry_agent::{AgentError, Configuration, ExporterProvider, RuntimeHandle, Service};

/// Exporter provider wiring every signal to in-memory exporters
///
/// Records which signals were installed and the configuration seen.
#[derive(Clone, Default)]
pub struct InMemoryExporterProvider {
    pub spans: InMemorySpanExporter,
    pub metrics: InMemoryMetricExporter,
    pub logs: InMemoryLogExporter,
    installed: Arc<Mutex<Vec<&'static str>>>,
    seen: Arc<Mutex<Vec<Configuration>>>,
}

impl InMemoryExporterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals installed so far, in installation order
    pub fn installed_signals(&self) -> Vec<&'static str> {
        self.installed.lock().unwrap().clone()
    }

    /// Configuration passed to the most recent installation
    pub fn last_configuration(&self) -> Option<Configuration> {
        self.seen.lock().unwrap().last().cloned()
    }

    fn record(&self, signal: &'static str, config: &Configuration) {
        self.installed.lock().unwrap().push(signal);
        self.seen.lock().unwrap().push(config.clone());
    }
}

impl fmt::Debug for InMemoryExporterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryExporterProvider")
            .field("installed", &self.installed_signals())
            .finish()
    }
}

impl ExporterProvider for InMemoryExporterProvider {
    fn install_traces(
        &self,
        builder: TracerProviderBuilder,
        config: &Configuration,
    ) -> Result<TracerProviderBuilder, AgentError> {
        self.record("traces", config);
        Ok(builder.with_simple_exporter(self.spans.clone()))
    }

    fn install_metrics(
        &self,
        builder: MeterProviderBuilder,
        config: &Configuration,
    ) -> Result<MeterProviderBuilder, AgentError> {
        self.record("metrics", config);
        Ok(builder.with_reader(PeriodicReader::builder(self.metrics.clone()).build()))
    }

    fn install_logs(
        &self,
        builder: LoggerProviderBuilder,
        config: &Configuration,
    ) -> Result<LoggerProviderBuilder, AgentError> {
        self.record("logs", config);
        Ok(builder.with_simple_exporter(self.logs.clone()))
    }
}

/// Exporter provider that refuses to build span exporters
#[derive(Debug, Default)]
pub struct BrokenExporterProvider;

impl ExporterProvider for BrokenExporterProvider {
    fn install_traces(
        &self,
        _builder: TracerProviderBuilder,
        _config: &Configuration,
    ) -> Result<TracerProviderBuilder, AgentError> {
        Err(AgentError::ExporterError("collector unreachable".to_string()))
    }

    fn install_metrics(
        &self,
        builder: MeterProviderBuilder,
        _config: &Configuration,
    ) -> Result<MeterProviderBuilder, AgentError> {
        Ok(builder)
    }

    fn install_logs(
        &self,
        builder: LoggerProviderBuilder,
        _config: &Configuration,
    ) -> Result<LoggerProviderBuilder, AgentError> {
        Ok(builder)
    }
}

/// Resource attribute that makes `CountingHandle::from_configuration` fail
pub const FAIL_HANDLE_ATTRIBUTE: &str = "test.fail_handle";

/// Runtime handle that counts flushes and shutdowns
#[derive(Debug, Clone, Default)]
pub struct CountingHandle {
    service_name: String,
    flushes: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl CountingHandle {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            ..Self::default()
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn flushes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.flushes)
    }

    pub fn shutdowns(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.shutdowns)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl RuntimeHandle for CountingHandle {
    fn from_configuration(config: &Configuration) -> Result<Self, AgentError> {
        if config.resource_attributes().contains_key(FAIL_HANDLE_ATTRIBUTE) {
            return Err(AgentError::ExporterError("handle construction failed".to_string()));
        }
        Ok(Self::new(config.service_name()))
    }

    fn force_flush(&self) -> Result<(), AgentError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&self) -> Result<(), AgentError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Service that appends its transitions to a shared log
pub struct RecordingService {
    name: &'static str,
    fail_start: bool,
    fail_stop: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingService {
    pub fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail_start: false,
            fail_stop: false,
            log: Arc::clone(log),
        })
    }

    pub fn failing_start(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail_start: true,
            fail_stop: false,
            log: Arc::clone(log),
        })
    }

    pub fn failing_stop(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail_start: false,
            fail_stop: true,
            log: Arc::clone(log),
        })
    }
}

impl Service for RecordingService {
    fn name(&self) -> &str {
        self.name
    }

    fn start(&self) -> Result<(), AgentError> {
        if self.fail_start {
            return Err(AgentError::ServiceError(format!("{} failed to start", self.name)));
        }
        self.log.lock().unwrap().push(format!("start {}", self.name));
        Ok(())
    }

    fn stop(&self) -> Result<(), AgentError> {
        self.log.lock().unwrap().push(format!("stop {}", self.name));
        if self.fail_stop {
            return Err(AgentError::ServiceError(format!("{} failed to stop", self.name)));
        }
        Ok(())
    }
}

pub fn new_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}
