//! Service infrastructure shared by insights binaries

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::error::Result;

/// Health status for liveness probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub service_id: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness status for readiness probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessStatus {
    pub ready: bool,
    pub dependencies: Vec<DependencyStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    pub latency_ms: Option<u64>,
}

/// Lifecycle every insights service implements
#[async_trait]
pub trait InsightsService: Send + Sync + 'static {
    /// Service identifier (e.g., "insights-api")
    fn service_id(&self) -> &'static str;

    /// Service version
    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Health check - is the service alive?
    async fn health(&self) -> HealthStatus;

    /// Readiness check - are all dependencies available?
    async fn ready(&self) -> ReadinessStatus;

    /// Graceful shutdown
    async fn shutdown(&self) -> Result<()>;

    /// Start serving; returns when the server stops
    async fn start(&self) -> Result<()>;
}

/// Standard service runtime bootstrap
pub struct MicroserviceRuntime {
    config: ServiceConfig,
    start_time: std::time::Instant,
}

impl MicroserviceRuntime {
    /// Create new runtime from environment
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: ServiceConfig::from_env(),
            start_time: std::time::Instant::now(),
        })
    }

    /// Run a service until it stops or a shutdown signal arrives
    pub async fn run<S: InsightsService>(service: Arc<S>) -> Result<()> {
        let runtime = Self::new()?;

        info!(
            service_id = service.service_id(),
            service_name = %runtime.config.service_name,
            version = service.version(),
            "Starting service"
        );

        let service_clone = service.clone();
        let mut service_handle = tokio::spawn(async move {
            if let Err(e) = service_clone.start().await {
                error!("Service error: {}", e);
            }
        });

        tokio::select! {
            _ = Self::wait_for_shutdown() => {
                info!("Shutdown signal received, gracefully stopping...");
            }
            _ = &mut service_handle => {
                warn!("Service stopped without a shutdown signal");
            }
        }

        if let Err(e) = service.shutdown().await {
            warn!("Error during shutdown: {}", e);
        }

        service_handle.abort();

        info!(
            uptime_seconds = runtime.start_time.elapsed().as_secs(),
            "Service stopped"
        );

        Ok(())
    }

    async fn wait_for_shutdown() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }
}
