//! Common resource attributes
//!
//! Every signal shares one `Resource` describing the service, the telemetry
//! distribution and the host it runs on. Attributes configured explicitly are
//! applied last and override the derived ones.

use crate::config::Configuration;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

pub const SERVICE_NAME: &str = "service.name";
pub const SERVICE_VERSION: &str = "service.version";
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment.name";
pub const TELEMETRY_DISTRO_NAME: &str = "telemetry.distro.name";
pub const TELEMETRY_DISTRO_VERSION: &str = "telemetry.distro.version";
pub const OS_TYPE: &str = "os.type";
pub const HOST_ARCH: &str = "host.arch";

/// Build the resource shared by all providers
pub fn build_resource(config: &Configuration) -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, config.service_name().to_string()),
        KeyValue::new(TELEMETRY_DISTRO_NAME, env!("CARGO_PKG_NAME")),
        KeyValue::new(TELEMETRY_DISTRO_VERSION, env!("CARGO_PKG_VERSION")),
        KeyValue::new(OS_TYPE, os_type()),
        KeyValue::new(HOST_ARCH, std::env::consts::ARCH),
    ];

    if let Some(version) = config.service_version() {
        attributes.push(KeyValue::new(SERVICE_VERSION, version.to_string()));
    }

    if let Some(environment) = config.deployment_environment() {
        attributes.push(KeyValue::new(DEPLOYMENT_ENVIRONMENT, environment.to_string()));
    }

    let overrides: Vec<KeyValue> = config
        .resource_attributes()
        .iter()
        .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
        .collect();

    Resource::builder()
        .with_attributes(attributes)
        .with_attributes(overrides)
        .build()
}

// Semantic conventions spell macOS as "darwin".
fn os_type() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}
