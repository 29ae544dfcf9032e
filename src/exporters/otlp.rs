//! OTLP exporters via opentelemetry-otlp
//!
//! Builds gRPC or HTTP exporters from the configuration's `ExportSettings`:
//! batch processors for spans and logs, a periodic reader for metrics.
//!
//! The gRPC transport needs a tokio runtime on the building thread; without
//! one, installation fails with `ExporterError`. HTTP exporters use a blocking
//! client and work anywhere.

use super::ExporterProvider;
use crate::config::{Configuration, ExportSettings, Protocol};
use crate::error::AgentError;
use opentelemetry_otlp::{
    LogExporter, MetricExporter, SpanExporter, WithExportConfig, WithHttpConfig, WithTonicConfig,
};
use opentelemetry_sdk::logs::LoggerProviderBuilder;
use opentelemetry_sdk::metrics::{MeterProviderBuilder, PeriodicReader};
use opentelemetry_sdk::trace::TracerProviderBuilder;
use std::collections::HashMap;
use tonic::metadata::{AsciiMetadataKey, MetadataMap, MetadataValue};
use tracing::{debug, warn};

const TRACES_PATH: &str = "/v1/traces";
const METRICS_PATH: &str = "/v1/metrics";
const LOGS_PATH: &str = "/v1/logs";

/// Exporter provider that sends every signal over OTLP
#[derive(Debug, Clone, Copy, Default)]
pub struct OtlpExporterProvider;

impl OtlpExporterProvider {
    pub fn new() -> Self {
        Self
    }
}

fn http_protocol(protocol: Protocol) -> opentelemetry_otlp::Protocol {
    match protocol {
        Protocol::HttpJson => opentelemetry_otlp::Protocol::HttpJson,
        _ => opentelemetry_otlp::Protocol::HttpBinary,
    }
}

/// Convert export headers to gRPC metadata
///
/// Entries that are not valid ASCII metadata are skipped with a warning.
fn grpc_metadata(settings: &ExportSettings) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (key, value) in settings.effective_headers() {
        match (
            key.parse::<AsciiMetadataKey>(),
            value.parse::<MetadataValue<_>>(),
        ) {
            (Ok(k), Ok(v)) => {
                metadata.insert(k, v);
            }
            _ => warn!(header = %key, "Skipping export header that is not valid gRPC metadata"),
        }
    }
    metadata
}

fn http_headers(settings: &ExportSettings) -> HashMap<String, String> {
    settings.effective_headers().into_iter().collect()
}

/// gRPC exporters spawn their channel on the ambient tokio runtime
fn require_runtime_for(protocol: Protocol) -> Result<(), AgentError> {
    if protocol != Protocol::Grpc {
        return Ok(());
    }
    tokio::runtime::Handle::try_current()
        .map(|_| ())
        .map_err(|_| {
            AgentError::ExporterError("gRPC OTLP export requires a tokio runtime".to_string())
        })
}

fn exporter_error(signal: &str, e: impl std::fmt::Display) -> AgentError {
    AgentError::ExporterError(format!("Failed to build OTLP {} exporter: {}", signal, e))
}

impl ExporterProvider for OtlpExporterProvider {
    fn install_traces(
        &self,
        builder: TracerProviderBuilder,
        config: &Configuration,
    ) -> Result<TracerProviderBuilder, AgentError> {
        let settings = config.export();
        require_runtime_for(settings.protocol)?;
        let exporter = match settings.protocol {
            Protocol::Grpc => {
                let mut exporter = SpanExporter::builder()
                    .with_tonic()
                    .with_timeout(settings.timeout)
                    .with_metadata(grpc_metadata(settings));
                if let Some(endpoint) = settings.signal_endpoint(TRACES_PATH) {
                    exporter = exporter.with_endpoint(endpoint);
                }
                exporter.build()
            }
            protocol => {
                let mut exporter = SpanExporter::builder()
                    .with_http()
                    .with_protocol(http_protocol(protocol))
                    .with_timeout(settings.timeout)
                    .with_headers(http_headers(settings));
                if let Some(endpoint) = settings.signal_endpoint(TRACES_PATH) {
                    exporter = exporter.with_endpoint(endpoint);
                }
                exporter.build()
            }
        }
        .map_err(|e| exporter_error("span", e))?;

        debug!(protocol = ?settings.protocol, "Installed OTLP span exporter");
        Ok(builder.with_batch_exporter(exporter))
    }

    fn install_metrics(
        &self,
        builder: MeterProviderBuilder,
        config: &Configuration,
    ) -> Result<MeterProviderBuilder, AgentError> {
        let settings = config.export();
        require_runtime_for(settings.protocol)?;
        let exporter = match settings.protocol {
            Protocol::Grpc => {
                let mut exporter = MetricExporter::builder()
                    .with_tonic()
                    .with_timeout(settings.timeout)
                    .with_metadata(grpc_metadata(settings));
                if let Some(endpoint) = settings.signal_endpoint(METRICS_PATH) {
                    exporter = exporter.with_endpoint(endpoint);
                }
                exporter.build()
            }
            protocol => {
                let mut exporter = MetricExporter::builder()
                    .with_http()
                    .with_protocol(http_protocol(protocol))
                    .with_timeout(settings.timeout)
                    .with_headers(http_headers(settings));
                if let Some(endpoint) = settings.signal_endpoint(METRICS_PATH) {
                    exporter = exporter.with_endpoint(endpoint);
                }
                exporter.build()
            }
        }
        .map_err(|e| exporter_error("metric", e))?;

        let reader = PeriodicReader::builder(exporter)
            .with_interval(config.signals().metric_interval)
            .build();

        debug!(protocol = ?settings.protocol, "Installed OTLP metric reader");
        Ok(builder.with_reader(reader))
    }

    fn install_logs(
        &self,
        builder: LoggerProviderBuilder,
        config: &Configuration,
    ) -> Result<LoggerProviderBuilder, AgentError> {
        let settings = config.export();
        require_runtime_for(settings.protocol)?;
        let exporter = match settings.protocol {
            Protocol::Grpc => {
                let mut exporter = LogExporter::builder()
                    .with_tonic()
                    .with_timeout(settings.timeout)
                    .with_metadata(grpc_metadata(settings));
                if let Some(endpoint) = settings.signal_endpoint(LOGS_PATH) {
                    exporter = exporter.with_endpoint(endpoint);
                }
                exporter.build()
            }
            protocol => {
                let mut exporter = LogExporter::builder()
                    .with_http()
                    .with_protocol(http_protocol(protocol))
                    .with_timeout(settings.timeout)
                    .with_headers(http_headers(settings));
                if let Some(endpoint) = settings.signal_endpoint(LOGS_PATH) {
                    exporter = exporter.with_endpoint(endpoint);
                }
                exporter.build()
            }
        }
        .map_err(|e| exporter_error("log", e))?;

        debug!(protocol = ?settings.protocol, "Installed OTLP log exporter");
        Ok(builder.with_batch_exporter(exporter))
    }
}
