//! Insights report client

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use insights_telemetry::{Counter, Histogram};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::decode::decode_result;
use crate::projection::{project_count_per_day, project_count_per_key, project_error_details, CountColumns};
use crate::query::{self, ExceptionKind, Query, TimeWindow};
use crate::timeline::{join_categories, merge_timeline};
use crate::transport::{AppContext, HttpTransport, QueryTransport};
use crate::types::{CountPerDay, CountPerKey, ErrorDetails, EventItem, EventType, QueryResult};
use crate::Result;

/// Query counters for one client
#[derive(Clone)]
struct ClientMetrics {
    queries: Counter,
    failures: Counter,
    latency_ms: Histogram,
}

impl ClientMetrics {
    fn new() -> Self {
        Self {
            queries: Counter::new("queries_total"),
            failures: Counter::new("query_failures_total"),
            latency_ms: Histogram::new("query_latency_ms"),
        }
    }
}

/// Point-in-time view of the client metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub query_failures_total: u64,
    pub query_latency_ms_mean: f64,
    pub query_latency_ms_p95: f64,
}

/// Builds typed reports from the remote store
#[derive(Clone)]
pub struct InsightsClient {
    transport: Arc<dyn QueryTransport>,
    metrics: ClientMetrics,
}

impl InsightsClient {
    pub fn new(transport: Arc<dyn QueryTransport>) -> Self {
        Self {
            transport,
            metrics: ClientMetrics::new(),
        }
    }

    /// Client over the HTTP transport
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    async fn run_query(&self, ctx: &AppContext, query: &Query) -> Result<QueryResult> {
        self.metrics.queries.inc();
        let started = Instant::now();

        let outcome = match self.transport.post_query(ctx, query).await {
            Ok(body) => QueryResult::from_json(&body),
            Err(e) => Err(e),
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.latency_ms.record(elapsed_ms);
        if outcome.is_err() {
            self.metrics.failures.inc();
        }
        debug!(elapsed_ms, ok = outcome.is_ok(), "Query completed");

        outcome
    }

    async fn count_per_day(&self, ctx: &AppContext, kind: ExceptionKind, days: u32) -> Result<Vec<CountPerDay>> {
        let query = query::count_per_day(kind, days)?;
        let result = self.run_query(ctx, &query).await?;
        project_count_per_day(&decode_result(&result)?, &CountColumns::default())
    }

    async fn count_grouped(&self, ctx: &AppContext, kind: ExceptionKind, days: u32) -> Result<Vec<CountPerKey>> {
        let query = query::count_grouped(kind, days)?;
        let result = self.run_query(ctx, &query).await?;
        project_count_per_key(&decode_result(&result)?, &CountColumns::default())
    }

    async fn details(&self, ctx: &AppContext, kind: ExceptionKind, id: &str, days: u32) -> Result<ErrorDetails> {
        let query = query::details(kind, id, days)?;
        let result = self.run_query(ctx, &query).await?;
        project_error_details(&decode_result(&result)?)
    }

    /// Non-crash exceptions per day
    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    pub async fn errors_per_day(&self, ctx: &AppContext, days: u32) -> Result<Vec<CountPerDay>> {
        self.count_per_day(ctx, ExceptionKind::Error, days).await
    }

    /// Crashes per day
    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    pub async fn crashes_per_day(&self, ctx: &AppContext, days: u32) -> Result<Vec<CountPerDay>> {
        self.count_per_day(ctx, ExceptionKind::Crash, days).await
    }

    /// Non-crash exceptions per problem id
    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    pub async fn errors_grouped(&self, ctx: &AppContext, days: u32) -> Result<Vec<CountPerKey>> {
        self.count_grouped(ctx, ExceptionKind::Error, days).await
    }

    /// Crashes per `problemId - outerMessage`
    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    pub async fn crashes_grouped(&self, ctx: &AppContext, days: u32) -> Result<Vec<CountPerKey>> {
        self.count_grouped(ctx, ExceptionKind::Crash, days).await
    }

    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    pub async fn error_details(&self, ctx: &AppContext, id: &str, days: u32) -> Result<ErrorDetails> {
        self.details(ctx, ExceptionKind::Error, id, days).await
    }

    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    pub async fn crash_details(&self, ctx: &AppContext, id: &str, days: u32) -> Result<ErrorDetails> {
        self.details(ctx, ExceptionKind::Crash, id, days).await
    }

    /// Everything a user did in the hour leading up to `reference`, newest first
    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    pub async fn user_timeline(
        &self,
        ctx: &AppContext,
        user_id: &str,
        reference: DateTime<Utc>,
    ) -> Result<Vec<EventItem>> {
        let window = TimeWindow::hour_before(reference);

        let requests = EventType::ALL
            .iter()
            .map(|&category| Ok((category, query::timeline(category, user_id, &window)?)))
            .collect::<Result<Vec<_>>>()?;

        let results = join_categories(requests, |query: Query| async move {
            self.run_query(ctx, &query).await
        })
        .await?;

        let timeline = merge_timeline(&results)?;
        info!(events = timeline.len(), "User timeline assembled");
        Ok(timeline)
    }

    /// Whether the store accepts the credentials
    pub async fn validate_token(&self, ctx: &AppContext) -> Result<bool> {
        self.transport.validate(ctx).await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_total: self.metrics.queries.get(),
            query_failures_total: self.metrics.failures.get(),
            query_latency_ms_mean: self.metrics.latency_ms.mean(),
            query_latency_ms_p95: self.metrics.latency_ms.percentile(95.0),
        }
    }
}
