//! Transport to the remote query endpoint

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::query::Query;
use crate::{InsightsError, Result};

const API_KEY_HEADER: &str = "x-api-key";

/// Credentials for one application, passed explicitly into every call
#[derive(Clone, PartialEq, Eq)]
pub struct AppContext {
    pub app_id: String,
    pub api_key: String,
}

impl AppContext {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Sends queries to the store and returns the raw response body
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Post one query, returning the raw JSON body
    async fn post_query(&self, ctx: &AppContext, query: &Query) -> Result<String>;

    /// Check that the credentials are accepted
    async fn validate(&self, ctx: &AppContext) -> Result<bool>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| InsightsError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| InsightsError::Config(format!("Invalid base URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(InsightsError::Config(format!("Invalid base URL {}", config.base_url)));
        }

        Ok(Self { client, base_url })
    }

    /// `{base}/v1/apps/{app_id}/{resource..}` with the app id encoded as a
    /// single path segment
    fn app_url(&self, ctx: &AppContext, resource: &[&str]) -> Result<Url> {
        let app_id = ctx.app_id.as_str();
        if app_id.is_empty() || app_id == "." || app_id == ".." || app_id.chars().any(char::is_control) {
            return Err(InsightsError::InvalidParameter(format!(
                "app id {:?} is not a valid path segment",
                app_id
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InsightsError::Config(format!("Invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "apps"])
            .push(app_id)
            .extend(resource);
        Ok(url)
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    #[instrument(skip(self, ctx, query), fields(app_id = %ctx.app_id))]
    async fn post_query(&self, ctx: &AppContext, query: &Query) -> Result<String> {
        let url = self.app_url(ctx, &["query"])?;

        debug!(query = %query, "Posting query");

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &ctx.api_key)
            .json(query)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.text().await?)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(InsightsError::Unauthorized(format!("Query rejected with {}", status)))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Query failed");
            Err(InsightsError::Transport(format!("{}: {}", status, error_text)))
        }
    }

    #[instrument(skip(self, ctx), fields(app_id = %ctx.app_id))]
    async fn validate(&self, ctx: &AppContext) -> Result<bool> {
        let mut url = self.app_url(ctx, &["events", "$all"])?;
        url.set_query(Some("$top=5"));

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &ctx.api_key)
            .send()
            .await?;

        debug!(status = response.status().as_u16(), "Token validation response");
        Ok(response.status().is_success())
    }
}
