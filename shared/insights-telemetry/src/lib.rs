//! Insights Telemetry
//!
//! Log subscriber setup, optional OTLP span export, and the in-process
//! counters the report client keeps.

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{Counter, Histogram};
pub use tracing_setup::init_tracing;

/// Install logging (and span export when `OTEL_EXPORTER_OTLP_ENDPOINT` is
/// set) for the named service. Hold the guard until the process exits.
pub fn init(service_name: &str) -> Result<TelemetryGuard, TelemetryError> {
    let config = TelemetryConfig::from_env();
    let exporting = init_tracing(service_name, &config)?;
    Ok(TelemetryGuard { exporting })
}

/// Flushes pending spans on drop when an exporter was installed
pub struct TelemetryGuard {
    exporting: bool,
}

impl TelemetryGuard {
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.exporting {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[error("OTLP exporter setup failed: {0}")]
    Exporter(String),
}
