//! Configuration types for the telemetry agent
//!
//! `ConfigurationDraft` is the mutable accumulator every builder and loader
//! writes into; `Configuration` is the immutable value produced by
//! [`ConfigurationDraft::finalize`]. A finalized configuration never changes:
//! interceptors derive new values through [`Configuration::amend`].

use crate::error::AgentError;
use crate::exporters::ExporterProvider;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default exporter timeout
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between periodic metric exports
pub const DEFAULT_METRIC_INTERVAL: Duration = Duration::from_secs(60);

/// Default log level for the optional tracing subscriber
pub const DEFAULT_LOG_LEVEL: &str = "info";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// OTLP transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// OTLP over gRPC (default port 4317); requires a tokio runtime
    #[default]
    Grpc,
    /// OTLP protobuf over HTTP (default port 4318)
    HttpBinary,
    /// OTLP JSON over HTTP
    HttpJson,
}

impl FromStr for Protocol {
    type Err = AgentError;

    /// Accepts the `OTEL_EXPORTER_OTLP_PROTOCOL` spellings as well as the
    /// snake_case names used in YAML files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grpc" => Ok(Protocol::Grpc),
            "http/protobuf" | "http_binary" => Ok(Protocol::HttpBinary),
            "http/json" | "http_json" => Ok(Protocol::HttpJson),
            other => Err(AgentError::ConfigurationError(format!(
                "unknown OTLP protocol: '{}'",
                other
            ))),
        }
    }
}

/// Output format of the optional tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Credentials sent with every export request
#[derive(Clone)]
pub enum Authentication {
    /// Sent as `Authorization: Bearer <token>`
    SecretToken(SecretString),
    /// Sent as `Authorization: ApiKey <key>`
    ApiKey(SecretString),
}

impl Authentication {
    /// Value of the `Authorization` header for this credential
    pub fn header_value(&self) -> String {
        match self {
            Authentication::SecretToken(token) => format!("Bearer {}", token.expose_secret()),
            Authentication::ApiKey(key) => format!("ApiKey {}", key.expose_secret()),
        }
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authentication::SecretToken(_) => f.write_str("SecretToken([REDACTED])"),
            Authentication::ApiKey(_) => f.write_str("ApiKey([REDACTED])"),
        }
    }
}

/// Exporter connection settings
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Collector endpoint; exporters fall back to their own default when absent
    pub endpoint: Option<Url>,
    /// Transport protocol
    pub protocol: Protocol,
    /// Per-request export timeout
    pub timeout: Duration,
    /// Extra headers sent with each export request
    pub headers: BTreeMap<String, String>,
    /// Optional credentials, rendered as an `authorization` header
    pub authentication: Option<Authentication>,
}

impl ExportSettings {
    /// Headers including the `authorization` header derived from credentials
    ///
    /// An explicit `authorization` header in `headers` wins over credentials.
    pub fn effective_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        if let Some(auth) = &self.authentication {
            headers
                .entry("authorization".to_string())
                .or_insert_with(|| auth.header_value());
        }
        headers
    }

    /// Endpoint for one signal
    ///
    /// gRPC uses the endpoint as-is; HTTP appends the signal path
    /// (`/v1/traces`, `/v1/metrics`, `/v1/logs`).
    pub fn signal_endpoint(&self, path: &str) -> Option<String> {
        let endpoint = self.endpoint.as_ref()?;
        match self.protocol {
            Protocol::Grpc => Some(endpoint.as_str().to_string()),
            Protocol::HttpBinary | Protocol::HttpJson => Some(format!(
                "{}{}",
                endpoint.as_str().trim_end_matches('/'),
                path
            )),
        }
    }
}

/// Which signals get an exporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSettings {
    pub traces: bool,
    pub metrics: bool,
    pub logs: bool,
    /// Interval of the periodic metric reader
    pub metric_interval: Duration,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            traces: true,
            metrics: true,
            logs: true,
            metric_interval: DEFAULT_METRIC_INTERVAL,
        }
    }
}

/// Settings for the optional `tracing` subscriber installed by the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Install a global subscriber when the agent is built (default: false)
    pub install_subscriber: bool,
    /// Maximum level: one of trace, debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            install_subscriber: false,
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Mutable accumulator of configuration options
///
/// Every option is optional here. Setters perform no validation; missing and
/// malformed options are reported by [`ConfigurationDraft::finalize`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use telemetry_agent::ConfigurationDraft;
///
/// let config = ConfigurationDraft::new()
///     .with_service_name("checkout")
///     .with_export_endpoint("http://collector:4317")
///     .with_export_timeout(Duration::from_secs(5))
///     .finalize()
///     .unwrap();
///
/// assert_eq!(config.service_name(), "checkout");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigurationDraft {
    /// Logical service name (required)
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub deployment_environment: Option<String>,
    /// Extra resource attributes
    pub resource_attributes: BTreeMap<String, String>,
    /// Installs exporters into the SDK providers
    pub exporter_provider: Option<Arc<dyn ExporterProvider>>,
    /// Collector endpoint, validated as an http(s) URL on finalize
    pub export_endpoint: Option<String>,
    pub export_protocol: Option<Protocol>,
    pub export_timeout: Option<Duration>,
    pub export_headers: BTreeMap<String, String>,
    pub authentication: Option<Authentication>,
    pub traces_enabled: Option<bool>,
    pub metrics_enabled: Option<bool>,
    pub logs_enabled: Option<bool>,
    pub metric_interval: Option<Duration>,
    pub install_log_subscriber: Option<bool>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl ConfigurationDraft {
    /// Create an empty draft
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn with_service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    pub fn with_deployment_environment(mut self, environment: impl Into<String>) -> Self {
        self.deployment_environment = Some(environment.into());
        self
    }

    /// Add a resource attribute, replacing any previous value for `key`
    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource_attributes.insert(key.into(), value.into());
        self
    }

    /// Set the exporter provider
    ///
    /// # Arguments
    ///
    /// * `provider` - Installs exporters into each SDK provider builder
    pub fn with_exporter_provider(mut self, provider: Arc<dyn ExporterProvider>) -> Self {
        self.exporter_provider = Some(provider);
        self
    }

    pub fn with_export_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.export_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_export_protocol(mut self, protocol: Protocol) -> Self {
        self.export_protocol = Some(protocol);
        self
    }

    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = Some(timeout);
        self
    }

    /// Add an export header, replacing any previous value for `name`
    ///
    /// Header names are stored lowercase.
    pub fn with_export_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.export_headers
            .insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Authenticate exports with a secret token
    pub fn with_secret_token(mut self, token: impl Into<String>) -> Self {
        self.authentication = Some(Authentication::SecretToken(SecretString::new(token.into())));
        self
    }

    /// Authenticate exports with an API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.authentication = Some(Authentication::ApiKey(SecretString::new(key.into())));
        self
    }

    pub fn with_traces_enabled(mut self, enabled: bool) -> Self {
        self.traces_enabled = Some(enabled);
        self
    }

    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = Some(enabled);
        self
    }

    pub fn with_logs_enabled(mut self, enabled: bool) -> Self {
        self.logs_enabled = Some(enabled);
        self
    }

    pub fn with_metric_interval(mut self, interval: Duration) -> Self {
        self.metric_interval = Some(interval);
        self
    }

    /// Install a global `tracing` subscriber when the agent is built
    pub fn with_log_subscriber(mut self, install: bool) -> Self {
        self.install_log_subscriber = Some(install);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Overlay `other` onto this draft
    ///
    /// Options set in `other` win; map entries are merged key by key. Used to
    /// layer file, environment and programmatic sources.
    pub fn merge(mut self, other: ConfigurationDraft) -> Self {
        fn overlay<T>(base: &mut Option<T>, top: Option<T>) {
            if top.is_some() {
                *base = top;
            }
        }

        overlay(&mut self.service_name, other.service_name);
        overlay(&mut self.service_version, other.service_version);
        overlay(&mut self.deployment_environment, other.deployment_environment);
        self.resource_attributes.extend(other.resource_attributes);
        overlay(&mut self.exporter_provider, other.exporter_provider);
        overlay(&mut self.export_endpoint, other.export_endpoint);
        overlay(&mut self.export_protocol, other.export_protocol);
        overlay(&mut self.export_timeout, other.export_timeout);
        self.export_headers.extend(other.export_headers);
        overlay(&mut self.authentication, other.authentication);
        overlay(&mut self.traces_enabled, other.traces_enabled);
        overlay(&mut self.metrics_enabled, other.metrics_enabled);
        overlay(&mut self.logs_enabled, other.logs_enabled);
        overlay(&mut self.metric_interval, other.metric_interval);
        overlay(&mut self.install_log_subscriber, other.install_log_subscriber);
        overlay(&mut self.log_level, other.log_level);
        overlay(&mut self.log_format, other.log_format);
        self
    }

    /// Convert the draft into an immutable `Configuration`
    ///
    /// Applies defaults for unset options and validates the rest.
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredOptionError("service_name")` if no non-blank
    /// service name was set, and `ConfigurationError` if:
    /// - `export_endpoint` is not an `http://` or `https://` URL
    /// - `export_timeout` or `metric_interval` is zero
    /// - `log_level` is not one of trace, debug, info, warn, error
    /// - an export header name is blank
    pub fn finalize(self) -> Result<Configuration, AgentError> {
        let service_name = self
            .service_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AgentError::MissingRequiredOptionError("service_name".to_string()))?;

        let endpoint = self
            .export_endpoint
            .as_deref()
            .map(parse_endpoint)
            .transpose()?;

        let timeout = self.export_timeout.unwrap_or(DEFAULT_EXPORT_TIMEOUT);
        if timeout.is_zero() {
            return Err(AgentError::ConfigurationError(
                "export_timeout must be > 0".to_string(),
            ));
        }

        if self.export_headers.keys().any(|name| name.trim().is_empty()) {
            return Err(AgentError::ConfigurationError(
                "export header names cannot be empty".to_string(),
            ));
        }

        let metric_interval = self.metric_interval.unwrap_or(DEFAULT_METRIC_INTERVAL);
        if metric_interval.is_zero() {
            return Err(AgentError::ConfigurationError(
                "metric_interval must be > 0".to_string(),
            ));
        }

        let level = self
            .log_level
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(AgentError::ConfigurationError(format!(
                "log_level must be one of {:?}, got: '{}'",
                VALID_LOG_LEVELS, level
            )));
        }

        Ok(Configuration {
            service_name,
            service_version: self.service_version,
            deployment_environment: self.deployment_environment,
            resource_attributes: self.resource_attributes,
            exporter_provider: self.exporter_provider,
            export: ExportSettings {
                endpoint,
                protocol: self.export_protocol.unwrap_or_default(),
                timeout,
                headers: self.export_headers,
                authentication: self.authentication,
            },
            signals: SignalSettings {
                traces: self.traces_enabled.unwrap_or(true),
                metrics: self.metrics_enabled.unwrap_or(true),
                logs: self.logs_enabled.unwrap_or(true),
                metric_interval,
            },
            logging: LoggingSettings {
                install_subscriber: self.install_log_subscriber.unwrap_or(false),
                level,
                format: self.log_format.unwrap_or_default(),
            },
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, AgentError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        AgentError::ConfigurationError(format!("invalid export endpoint '{}': {}", raw, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AgentError::ConfigurationError(format!(
            "export endpoint must start with 'https://' or 'http://', got scheme: '{}'",
            scheme
        ))),
    }
}

/// Immutable, fully resolved agent configuration
///
/// Produced only by [`ConfigurationDraft::finalize`]. Fields are read through
/// accessors; use [`Configuration::amend`] to derive a modified copy.
#[derive(Debug, Clone)]
pub struct Configuration {
    service_name: String,
    service_version: Option<String>,
    deployment_environment: Option<String>,
    resource_attributes: BTreeMap<String, String>,
    exporter_provider: Option<Arc<dyn ExporterProvider>>,
    export: ExportSettings,
    signals: SignalSettings,
    logging: LoggingSettings,
}

impl Configuration {
    /// Start a new draft
    pub fn draft() -> ConfigurationDraft {
        ConfigurationDraft::new()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service_version(&self) -> Option<&str> {
        self.service_version.as_deref()
    }

    pub fn deployment_environment(&self) -> Option<&str> {
        self.deployment_environment.as_deref()
    }

    pub fn resource_attributes(&self) -> &BTreeMap<String, String> {
        &self.resource_attributes
    }

    pub fn exporter_provider(&self) -> Option<&Arc<dyn ExporterProvider>> {
        self.exporter_provider.as_ref()
    }

    pub fn export(&self) -> &ExportSettings {
        &self.export
    }

    pub fn signals(&self) -> &SignalSettings {
        &self.signals
    }

    pub fn logging(&self) -> &LoggingSettings {
        &self.logging
    }

    /// Turn the configuration back into a draft with every option set
    pub fn into_draft(self) -> ConfigurationDraft {
        ConfigurationDraft {
            service_name: Some(self.service_name),
            service_version: self.service_version,
            deployment_environment: self.deployment_environment,
            resource_attributes: self.resource_attributes,
            exporter_provider: self.exporter_provider,
            export_endpoint: self.export.endpoint.map(String::from),
            export_protocol: Some(self.export.protocol),
            export_timeout: Some(self.export.timeout),
            export_headers: self.export.headers,
            authentication: self.export.authentication,
            traces_enabled: Some(self.signals.traces),
            metrics_enabled: Some(self.signals.metrics),
            logs_enabled: Some(self.signals.logs),
            metric_interval: Some(self.signals.metric_interval),
            install_log_subscriber: Some(self.logging.install_subscriber),
            log_level: Some(self.logging.level),
            log_format: Some(self.logging.format),
        }
    }

    /// Derive a new configuration by editing a draft of this one
    ///
    /// The result is validated exactly like a freshly built configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use telemetry_agent::Configuration;
    ///
    /// let base = Configuration::draft().with_service_name("a").finalize().unwrap();
    /// let renamed = base.clone().amend(|d| d.with_service_name("b")).unwrap();
    ///
    /// assert_eq!(base.service_name(), "a");
    /// assert_eq!(renamed.service_name(), "b");
    /// ```
    pub fn amend<F>(self, edit: F) -> Result<Configuration, AgentError>
    where
        F: FnOnce(ConfigurationDraft) -> ConfigurationDraft,
    {
        edit(self.into_draft()).finalize()
    }
}
