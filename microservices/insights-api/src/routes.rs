//! HTTP routes for the report endpoints

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use insights_core::{DependencyStatus, HealthStatus, ReadinessStatus};
use insights_sdk::{
    AppContext, CountPerDay, CountPerKey, ErrorDetails, EventItem, InsightsClient, MetricsSnapshot,
};
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::ApiError;

const APP_ID_HEADER: &str = "x-app-id";
const API_KEY_HEADER: &str = "x-api-key";

pub const SERVICE_ID: &str = "insights-api";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub client: InsightsClient,
    pub config: Arc<ApiConfig>,
    started: Instant,
}

impl AppState {
    pub fn new(client: InsightsClient, config: Arc<ApiConfig>) -> Self {
        Self {
            client,
            config,
            started: Instant::now(),
        }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: SERVICE_ID.to_string(),
            version: VERSION.to_string(),
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }

    /// Always ready: requests may carry their own credentials when no
    /// defaults are configured
    pub fn readiness(&self) -> ReadinessStatus {
        let credentials = self.config.default_app_id.is_some() && self.config.default_api_key.is_some();

        ReadinessStatus {
            ready: true,
            dependencies: vec![DependencyStatus {
                name: "default-credentials".to_string(),
                available: credentials,
                latency_ms: None,
            }],
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .route("/api/v1/token/validate", post(validate_token))
        .route("/api/v1/errors/per-day", get(errors_per_day))
        .route("/api/v1/crashes/per-day", get(crashes_per_day))
        .route("/api/v1/errors/grouped", get(errors_grouped))
        .route("/api/v1/crashes/grouped", get(crashes_grouped))
        .route("/api/v1/errors/{id}", get(error_details))
        .route("/api/v1/crashes/{id}", get(crash_details))
        .route("/api/v1/users/{user_id}/timeline", get(user_timeline))
        .with_state(state)
}

/// Credentials from request headers, falling back to configured defaults
pub fn context(headers: &HeaderMap, config: &ApiConfig) -> Result<AppContext, ApiError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let app_id = header(APP_ID_HEADER)
        .or_else(|| config.default_app_id.clone())
        .ok_or(ApiError::MissingCredentials(APP_ID_HEADER))?;
    let api_key = header(API_KEY_HEADER)
        .or_else(|| config.default_api_key.clone())
        .ok_or(ApiError::MissingCredentials(API_KEY_HEADER))?;

    Ok(AppContext::new(app_id, api_key))
}

#[derive(Debug, Default, Deserialize)]
pub struct LookbackParams {
    pub days: Option<u32>,
}

impl LookbackParams {
    fn days(&self, config: &ApiConfig) -> u32 {
        self.days.unwrap_or(config.default_lookback_days)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineParams {
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub app_id: String,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.health())
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadinessStatus>) {
    let status = state.readiness();
    let code = if status.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.client.metrics())
}

pub async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let ctx = AppContext::new(req.app_id, req.api_key);
    let valid = state.client.validate_token(&ctx).await?;
    Ok(Json(ValidateResponse { valid }))
}

pub async fn errors_per_day(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LookbackParams>,
) -> Result<Json<Vec<CountPerDay>>, ApiError> {
    let ctx = context(&headers, &state.config)?;
    let days = params.days(&state.config);
    Ok(Json(state.client.errors_per_day(&ctx, days).await?))
}

pub async fn crashes_per_day(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LookbackParams>,
) -> Result<Json<Vec<CountPerDay>>, ApiError> {
    let ctx = context(&headers, &state.config)?;
    let days = params.days(&state.config);
    Ok(Json(state.client.crashes_per_day(&ctx, days).await?))
}

pub async fn errors_grouped(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LookbackParams>,
) -> Result<Json<Vec<CountPerKey>>, ApiError> {
    let ctx = context(&headers, &state.config)?;
    let days = params.days(&state.config);
    Ok(Json(state.client.errors_grouped(&ctx, days).await?))
}

pub async fn crashes_grouped(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LookbackParams>,
) -> Result<Json<Vec<CountPerKey>>, ApiError> {
    let ctx = context(&headers, &state.config)?;
    let days = params.days(&state.config);
    Ok(Json(state.client.crashes_grouped(&ctx, days).await?))
}

pub async fn error_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<LookbackParams>,
) -> Result<Json<ErrorDetails>, ApiError> {
    let ctx = context(&headers, &state.config)?;
    let days = params.days(&state.config);
    Ok(Json(state.client.error_details(&ctx, &id, days).await?))
}

pub async fn crash_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<LookbackParams>,
) -> Result<Json<ErrorDetails>, ApiError> {
    let ctx = context(&headers, &state.config)?;
    let days = params.days(&state.config);
    Ok(Json(state.client.crash_details(&ctx, &id, days).await?))
}

pub async fn user_timeline(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Query(params): Query<TimelineParams>,
) -> Result<Json<Vec<EventItem>>, ApiError> {
    let ctx = context(&headers, &state.config)?;
    let reference = params.timestamp.unwrap_or_else(Utc::now);
    Ok(Json(state.client.user_timeline(&ctx, &user_id, reference).await?))
}
