//! Integration tests for the agent Open/Closed lifecycle

mod common;

use common::{entries, new_log, CountingHandle, RecordingService, FAIL_HANDLE_ATTRIBUTE};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use telemetry_agent::{Agent, AgentBuilder, AgentError, Configuration, HandleSource};

fn builder() -> AgentBuilder<CountingHandle> {
    AgentBuilder::new().configure(|draft| draft.with_service_name("lifecycle"))
}

#[test]
fn test_close_is_idempotent() {
    let agent = builder().build().unwrap();
    let shutdowns = agent.handle().unwrap().shutdowns();

    assert!(!agent.is_closed());
    assert!(agent.owns_handle());

    for _ in 0..5 {
        assert_eq!(agent.close(), Ok(()));
    }

    assert!(agent.is_closed());
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn test_handle_is_unavailable_after_close() {
    let agent = builder().build().unwrap();
    assert_eq!(agent.handle().unwrap().service_name(), "lifecycle");

    agent.close().unwrap();

    assert!(matches!(agent.handle(), Err(AgentError::AgentClosedError)));
    assert_eq!(agent.flush(), Err(AgentError::AgentClosedError));
    assert!(agent.handle().unwrap_err().is_closed());
}

#[test]
fn test_flush_delegates_to_handle() {
    let agent = builder().build().unwrap();
    let flushes = agent.handle().unwrap().flushes();

    agent.flush().unwrap();
    agent.flush().unwrap();

    assert_eq!(flushes.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_close_releases_once() {
    let agent = Arc::new(builder().build().unwrap());
    let shutdowns = agent.handle().unwrap().shutdowns();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let agent = Arc::clone(&agent);
        tasks.push(tokio::task::spawn_blocking(move || agent.close()));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), Ok(()));
    }

    assert!(agent.is_closed());
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_closes_open_agent() {
    let agent = builder().build().unwrap();
    let shutdowns = agent.handle().unwrap().shutdowns();

    drop(agent);

    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_after_close_does_not_release_again() {
    let agent = builder().build().unwrap();
    let shutdowns = agent.handle().unwrap().shutdowns();

    agent.close().unwrap();
    drop(agent);

    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn test_preconstructed_handle_is_never_shut_down() {
    let handle = CountingHandle::new("external");
    let shutdowns = handle.shutdowns();

    let agent = builder()
        .with_preconstructed_handle(handle)
        .add_configuration_interceptor(|config: Configuration| {
            config.amend(|draft| draft.with_deployment_environment("test"))
        })
        .build()
        .unwrap();

    assert!(!agent.owns_handle());
    assert_eq!(agent.handle().unwrap().service_name(), "external");
    // the configuration pipeline still ran
    assert_eq!(agent.configuration().deployment_environment(), Some("test"));

    agent.close().unwrap();
    agent.close().unwrap();
    drop(agent);

    assert_eq!(shutdowns.load(Ordering::SeqCst), 0);
}

#[test]
fn test_with_handle_source() {
    let agent = builder()
        .with_handle_source(HandleSource::Preconstructed(CountingHandle::new("x")))
        .build()
        .unwrap();
    assert!(!agent.owns_handle());

    let agent = builder()
        .with_handle_source(HandleSource::DerivedFromConfiguration)
        .build()
        .unwrap();
    assert!(agent.owns_handle());
}

#[test]
fn test_handle_construction_failure_aborts_build() {
    let log = new_log();
    let result = builder()
        .configure(|draft| draft.with_resource_attribute(FAIL_HANDLE_ATTRIBUTE, "yes"))
        .with_service(RecordingService::new("reporter", &log))
        .build();

    assert_eq!(
        result.unwrap_err(),
        AgentError::ExporterError("handle construction failed".to_string())
    );
    assert!(entries(&log).is_empty());
}

#[test]
fn test_services_start_in_order_and_stop_in_reverse() {
    let log = new_log();
    let agent = builder()
        .with_service(RecordingService::new("metrics-bridge", &log))
        .with_service(RecordingService::new("session", &log))
        .with_service(RecordingService::new("reporter", &log))
        .build()
        .unwrap();

    assert_eq!(
        entries(&log),
        vec!["start metrics-bridge", "start session", "start reporter"]
    );
    assert_eq!(agent.service("session").unwrap().name(), "session");
    assert!(matches!(
        agent.service("missing"),
        Err(AgentError::ServiceError(_))
    ));

    agent.close().unwrap();
    agent.close().unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "start metrics-bridge",
            "start session",
            "start reporter",
            "stop reporter",
            "stop session",
            "stop metrics-bridge",
        ]
    );
}

#[test]
fn test_service_start_failure_rolls_back() {
    let log = new_log();
    let handle = CountingHandle::new("external");
    let shutdowns = handle.shutdowns();

    let result = builder()
        .with_preconstructed_handle(handle)
        .with_service(RecordingService::new("first", &log))
        .with_service(RecordingService::failing_start("second", &log))
        .with_service(RecordingService::new("third", &log))
        .build();

    assert_eq!(
        result.unwrap_err(),
        AgentError::ServiceError("second failed to start".to_string())
    );
    assert_eq!(entries(&log), vec!["start first", "stop first"]);
    assert_eq!(shutdowns.load(Ordering::SeqCst), 0);
}

#[test]
fn test_duplicate_service_names_are_rejected() {
    let log = new_log();
    let result = builder()
        .with_service(RecordingService::new("session", &log))
        .with_service(RecordingService::new("session", &log))
        .build();

    assert_eq!(
        result.unwrap_err(),
        AgentError::ServiceError("Service already registered with name: session".to_string())
    );
    assert!(entries(&log).is_empty());
}

#[test]
fn test_stop_failure_is_reported_once_and_handle_still_released() {
    let log = new_log();
    let agent = builder()
        .with_service(RecordingService::failing_stop("flaky", &log))
        .with_service(RecordingService::new("steady", &log))
        .build()
        .unwrap();
    let shutdowns = agent.handle().unwrap().shutdowns();

    assert_eq!(
        agent.close(),
        Err(AgentError::ServiceError("flaky failed to stop".to_string()))
    );
    assert!(agent.is_closed());
    assert_eq!(agent.close(), Ok(()));

    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(
        entries(&log),
        vec!["start flaky", "start steady", "stop steady", "stop flaky"]
    );
}

#[test]
fn test_agent_from_configuration() {
    let config = Configuration::draft()
        .with_service_name("direct")
        .finalize()
        .unwrap();

    let agent: Agent<CountingHandle> = Agent::from_configuration(config).unwrap();

    assert_eq!(agent.configuration().service_name(), "direct");
    assert_eq!(agent.handle().unwrap().service_name(), "direct");
    agent.close().unwrap();
    assert_eq!(agent.handle().map(|_| ()), Err(AgentError::AgentClosedError));
}
