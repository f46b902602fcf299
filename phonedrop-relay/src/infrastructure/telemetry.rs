use super::LogConfig;
use opentelemetry::sdk::propagation::TraceContextPropagator;
use opentelemetry::sdk::{
    trace::{self, RandomIdGenerator, Sampler},
    Resource,
};
use opentelemetry::{global, KeyValue};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

const SERVICE_NAME: &str = "phonedrop-relay";

fn telemetry_enabled() -> bool {
    env::var("ENABLE_TELEMETRY")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

/// Install logging plus, with `ENABLE_TELEMETRY=true`, a Jaeger exporter
pub fn init_telemetry(log: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !telemetry_enabled() {
        log.clone().init()?;
        tracing::info!("Telemetry disabled");
        return Ok(());
    }

    global::set_text_map_propagator(TraceContextPropagator::new());

    let jaeger_endpoint = env::var("JAEGER_ENDPOINT")
        .unwrap_or_else(|_| "http://jaeger:14268/api/traces".to_string());

    let tracer = opentelemetry_jaeger::new_collector_pipeline()
        .with_service_name(SERVICE_NAME)
        .with_endpoint(&jaeger_endpoint)
        .with_isahc()
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_max_events_per_span(64)
                .with_max_attributes_per_span(16)
                .with_resource(Resource::new(vec![
                    KeyValue::new("service.name", SERVICE_NAME),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                ])),
        )
        .with_timeout(std::time::Duration::from_secs(2))
        .install_batch(opentelemetry::runtime::Tokio)?;

    Registry::default()
        .with(log.env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(log.show_targets)
                .with_thread_ids(log.show_thread_ids)
                .json(),
        )
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    tracing::info!(endpoint = %jaeger_endpoint, "Telemetry initialized");
    Ok(())
}

pub fn shutdown_telemetry() {
    if telemetry_enabled() {
        // flush pending spans
        global::shutdown_tracer_provider();
    }
}
