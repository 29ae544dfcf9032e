//! Tests for error display and helpers

use telemetry_agent::AgentError;

#[test]
fn test_error_messages() {
    assert_eq!(
        AgentError::MissingRequiredOptionError("service_name".to_string()).to_string(),
        "Missing required option: service_name"
    );
    assert_eq!(AgentError::AgentClosedError.to_string(), "Agent is closed");
    assert_eq!(
        AgentError::InterceptorFailureError("rejected".to_string()).to_string(),
        "Interceptor failure: rejected"
    );
    assert_eq!(
        AgentError::ConfigurationError("bad".to_string()).to_string(),
        "Configuration error: bad"
    );
    assert_eq!(
        AgentError::ShutdownFailed("tracer provider: timeout".to_string()).to_string(),
        "Shutdown failed: tracer provider: timeout"
    );
}

#[test]
fn test_error_helpers() {
    assert!(AgentError::AgentClosedError.is_closed());
    assert!(!AgentError::ExporterError("x".to_string()).is_closed());

    assert_eq!(
        AgentError::MissingRequiredOptionError("exporter_provider".to_string()).missing_option(),
        Some("exporter_provider")
    );
    assert_eq!(AgentError::AgentClosedError.missing_option(), None);
}

#[test]
fn test_error_is_std_error() {
    fn boxed(e: AgentError) -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(e)
    }
    let err = boxed(AgentError::FlushFailed("meter provider: busy".to_string()));
    assert_eq!(err.to_string(), "Flush failed: meter provider: busy");
}
