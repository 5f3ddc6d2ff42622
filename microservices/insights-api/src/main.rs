//! Insights API
//!
//! Serves application error, crash and user timeline reports built from the
//! remote analytics store.

use insights_core::{
    HealthStatus, InsightsService, MicroserviceRuntime, ReadinessStatus, Result, ServiceError,
};
use insights_sdk::InsightsClient;
use std::sync::Arc;
use tracing::info;

mod config;
mod error;
mod routes;

pub use config::ApiConfig;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = insights_telemetry::init(routes::SERVICE_ID)
        .map_err(|e| ServiceError::Config(e.to_string()))?;

    info!(span_export = telemetry.is_exporting(), "Starting Insights API");

    let service = Arc::new(InsightsApiService::new()?);
    MicroserviceRuntime::run(service).await
}

/// Insights API service state
pub struct InsightsApiService {
    state: AppState,
}

impl InsightsApiService {
    pub fn new() -> Result<Self> {
        let config = ApiConfig::from_env()?;
        let client = InsightsClient::from_config(&config.client)
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        Ok(Self {
            state: AppState::new(client, Arc::new(config)),
        })
    }
}

#[async_trait::async_trait]
impl InsightsService for InsightsApiService {
    fn service_id(&self) -> &'static str {
        routes::SERVICE_ID
    }

    fn version(&self) -> &'static str {
        routes::VERSION
    }

    async fn health(&self) -> HealthStatus {
        self.state.health()
    }

    async fn ready(&self) -> ReadinessStatus {
        self.state.readiness()
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Insights API");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let config = &self.state.config;
        info!(
            http = %config.http_bind,
            store = %config.client.base_url,
            "Starting Insights API"
        );

        let app = routes::router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&config.http_bind).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
