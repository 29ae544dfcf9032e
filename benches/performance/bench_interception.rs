//! Performance benchmark for configuration interception
//!
//! Measures the cost of finalizing a draft and running interceptor chains of
//! increasing length over the resulting `Configuration`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use telemetry_agent::interceptor::composite;
use telemetry_agent::{AgentError, Configuration, ConfigurationDraft, Interceptor};

fn base_draft() -> ConfigurationDraft {
    ConfigurationDraft::new()
        .with_service_name("bench")
        .with_service_version("1.0.0")
        .with_export_endpoint("http://localhost:4317")
        .with_export_header("x-tenant", "blue")
        .with_resource_attribute("team", "platform")
}

fn bump_timeout() -> Arc<dyn Interceptor<Configuration>> {
    Arc::new(|config: Configuration| -> Result<Configuration, AgentError> {
        let timeout = config.export().timeout;
        config.amend(|draft| draft.with_export_timeout(timeout + Duration::from_millis(1)))
    })
}

fn bench_finalize(c: &mut Criterion) {
    let draft = base_draft();
    c.bench_function("finalize", |b| {
        b.iter(|| black_box(draft.clone().finalize()));
    });
}

fn bench_interceptor_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("interceptor_chain");
    let config = base_draft().finalize().expect("valid draft");

    for len in [0, 1, 4, 16] {
        let chain = composite((0..len).map(|_| bump_timeout()));
        group.bench_with_input(BenchmarkId::from_parameter(len), &chain, |b, chain| {
            b.iter(|| black_box(chain.intercept(config.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_finalize, bench_interceptor_chain);
criterion_main!(benches);
