//! Configuration loader for the telemetry agent
//!
//! Reads configuration from YAML files and environment variables into a
//! `ConfigurationDraft`. Nothing is finalized here: required options that are
//! still missing surface when the draft is finalized, so file, environment and
//! programmatic sources can be layered with [`ConfigurationDraft::merge`].

use crate::config::{ConfigurationDraft, LogFormat, Protocol};
use crate::error::AgentError;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// YAML configuration structure (for deserialization)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigYaml {
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub deployment_environment: Option<String>,
    #[serde(default)]
    pub resource_attributes: BTreeMap<String, String>,
    pub export: Option<ExportYaml>,
    pub signals: Option<SignalsYaml>,
    pub logging: Option<LoggingYaml>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportYaml {
    pub endpoint: Option<String>,
    pub protocol: Option<String>,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub secret_token: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalsYaml {
    pub traces: Option<bool>,
    pub metrics: Option<bool>,
    pub logs: Option<bool>,
    pub metric_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingYaml {
    pub install_subscriber: Option<bool>,
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl ConfigYaml {
    /// Convert the parsed file into a draft
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for an unknown protocol or when both
    /// `secret_token` and `api_key` are given.
    pub fn into_draft(self) -> Result<ConfigurationDraft, AgentError> {
        let mut draft = ConfigurationDraft::new();
        draft.service_name = self.service_name;
        draft.service_version = self.service_version;
        draft.deployment_environment = self.deployment_environment;
        draft.resource_attributes = self.resource_attributes;

        if let Some(export) = self.export {
            draft.export_endpoint = export.endpoint;
            draft.export_protocol = export.protocol.as_deref().map(str::parse).transpose()?;
            draft.export_timeout = export.timeout_ms.map(Duration::from_millis);
            for (name, value) in export.headers {
                draft = draft.with_export_header(name, value);
            }
            draft = with_credentials(draft, export.secret_token, export.api_key)?;
        }

        if let Some(signals) = self.signals {
            draft.traces_enabled = signals.traces;
            draft.metrics_enabled = signals.metrics;
            draft.logs_enabled = signals.logs;
            draft.metric_interval = signals.metric_interval_ms.map(Duration::from_millis);
        }

        if let Some(logging) = self.logging {
            draft.install_log_subscriber = logging.install_subscriber;
            draft.log_level = logging.level;
            draft.log_format = logging.format;
        }

        Ok(draft)
    }
}

fn with_credentials(
    draft: ConfigurationDraft,
    secret_token: Option<String>,
    api_key: Option<String>,
) -> Result<ConfigurationDraft, AgentError> {
    match (secret_token, api_key) {
        (Some(_), Some(_)) => Err(AgentError::ConfigurationError(
            "only one of secret_token and api_key can be set".to_string(),
        )),
        (Some(token), None) => Ok(draft.with_secret_token(token)),
        (None, Some(key)) => Ok(draft.with_api_key(key)),
        (None, None) => Ok(draft),
    }
}

/// Parse YAML configuration text
pub fn load_from_yaml_str(content: &str) -> Result<ConfigurationDraft, AgentError> {
    let yaml: ConfigYaml = serde_yaml::from_str(content)
        .map_err(|e| AgentError::ConfigurationError(format!("Failed to parse YAML: {}", e)))?;
    yaml.into_draft()
}

/// Load configuration from YAML file
///
/// # Arguments
///
/// * `path` - Path to YAML configuration file
///
/// # Returns
///
/// Returns the `ConfigurationDraft` described by the file, or
/// `ConfigurationError` if the file cannot be read or parsed.
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<ConfigurationDraft, AgentError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        AgentError::ConfigurationError(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    load_from_yaml_str(&content)
}

/// Load configuration from the process environment
///
/// See [`load_from_vars`] for the variables read.
pub fn load_from_env() -> Result<ConfigurationDraft, AgentError> {
    load_from_vars(|name| std::env::var(name).ok())
}

/// Load configuration from environment-style variables
///
/// Reads the standard OpenTelemetry variables:
/// - `OTEL_SERVICE_NAME`, `OTEL_SERVICE_VERSION`, `OTEL_DEPLOYMENT_ENVIRONMENT`
/// - `OTEL_RESOURCE_ATTRIBUTES` (`key=value,key=value`, values percent-decoded)
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_EXPORTER_OTLP_PROTOCOL`
/// - `OTEL_EXPORTER_OTLP_TIMEOUT` (milliseconds)
/// - `OTEL_EXPORTER_OTLP_HEADERS` (`key=value,key=value`, values percent-decoded,
///   so `Authorization=Bearer%20abc` yields `Bearer abc`)
/// - `OTEL_TRACES_EXPORTER`, `OTEL_METRICS_EXPORTER`, `OTEL_LOGS_EXPORTER`
///   (`none` disables the signal)
/// - `OTEL_METRIC_EXPORT_INTERVAL` (milliseconds)
///
/// and the agent's own `TELEMETRY_AGENT_SECRET_TOKEN`,
/// `TELEMETRY_AGENT_API_KEY` and `TELEMETRY_AGENT_LOG_LEVEL`.
/// Empty values count as unset.
///
/// # Arguments
///
/// * `lookup` - Returns the value of a variable, or `None` if unset
pub fn load_from_vars<F>(lookup: F) -> Result<ConfigurationDraft, AgentError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let mut draft = ConfigurationDraft::new();
    draft.service_name = var("OTEL_SERVICE_NAME");
    draft.service_version = var("OTEL_SERVICE_VERSION");
    draft.deployment_environment = var("OTEL_DEPLOYMENT_ENVIRONMENT");

    if let Some(raw) = var("OTEL_RESOURCE_ATTRIBUTES") {
        draft.resource_attributes = parse_key_value_list("OTEL_RESOURCE_ATTRIBUTES", &raw)?;
    }

    draft.export_endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT");
    draft.export_protocol = var("OTEL_EXPORTER_OTLP_PROTOCOL")
        .as_deref()
        .map(str::parse)
        .transpose()?;
    draft.export_timeout = var("OTEL_EXPORTER_OTLP_TIMEOUT")
        .map(|raw| parse_millis("OTEL_EXPORTER_OTLP_TIMEOUT", &raw))
        .transpose()?;

    if let Some(raw) = var("OTEL_EXPORTER_OTLP_HEADERS") {
        for (name, value) in parse_key_value_list("OTEL_EXPORTER_OTLP_HEADERS", &raw)? {
            draft = draft.with_export_header(name, value);
        }
    }

    draft = with_credentials(
        draft,
        var("TELEMETRY_AGENT_SECRET_TOKEN"),
        var("TELEMETRY_AGENT_API_KEY"),
    )?;

    draft.traces_enabled = var("OTEL_TRACES_EXPORTER").map(|v| !is_none(&v));
    draft.metrics_enabled = var("OTEL_METRICS_EXPORTER").map(|v| !is_none(&v));
    draft.logs_enabled = var("OTEL_LOGS_EXPORTER").map(|v| !is_none(&v));
    draft.metric_interval = var("OTEL_METRIC_EXPORT_INTERVAL")
        .map(|raw| parse_millis("OTEL_METRIC_EXPORT_INTERVAL", &raw))
        .transpose()?;

    draft.log_level = var("TELEMETRY_AGENT_LOG_LEVEL");

    Ok(draft)
}

fn is_none(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("none")
}

fn parse_millis(name: &str, raw: &str) -> Result<Duration, AgentError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| {
            AgentError::ConfigurationError(format!(
                "{} must be a number of milliseconds, got: '{}'",
                name, raw
            ))
        })
}

/// Parse `key=value,key=value`, ignoring empty entries
fn parse_key_value_list(name: &str, raw: &str) -> Result<BTreeMap<String, String>, AgentError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), decode_value(name, value.trim())?))
            }
            _ => Err(AgentError::ConfigurationError(format!(
                "{} entries must look like key=value, got: '{}'",
                name, entry
            ))),
        })
        .collect()
}

fn decode_value(name: &str, value: &str) -> Result<String, AgentError> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| {
            AgentError::ConfigurationError(format!(
                "{} values must be valid UTF-8 after percent-decoding, got: '{}'",
                name, value
            ))
        })
}
