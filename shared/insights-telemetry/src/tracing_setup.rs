//! Subscriber installation

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace, Resource};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// With an OTLP endpoint configured, spans are also batched to the
/// collector over gRPC; the return value says whether that exporter is
/// running. Must be called inside a tokio runtime in that case.
pub fn init_tracing(service_name: &str, config: &TelemetryConfig) -> Result<bool, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let otel_layer = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => {
            let tracer = otlp_tracer(service_name, endpoint)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };
    let exporting = otel_layer.is_some();

    let subscriber = tracing_subscriber::registry().with(otel_layer).with(env_filter);

    let installed = if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()
    } else {
        subscriber.with(fmt::layer().with_target(true)).try_init()
    };
    installed.map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    tracing::info!(
        service = service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        otlp_endpoint = config.otlp_endpoint.as_deref().unwrap_or("none"),
        "Tracing initialized"
    );

    Ok(exporting)
}

fn otlp_tracer(service_name: &str, endpoint: &str) -> Result<trace::Tracer, TelemetryError> {
    let resource = Resource::new(vec![KeyValue::new("service.name", service_name.to_string())]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(trace::config().with_resource(resource))
        .install_batch(runtime::Tokio)
        .map_err(|e| TelemetryError::Exporter(e.to_string()))
}
