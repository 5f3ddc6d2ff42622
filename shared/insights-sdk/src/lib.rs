//! Insights SDK
//!
//! Queries an Application Insights style analytics store and reshapes its
//! schema-less tabular results into typed error, crash and timeline reports.

mod client;
mod config;
mod error;
mod transport;
mod types;

pub mod decode;
pub mod projection;
pub mod query;
pub mod timeline;


pub use client::{InsightsClient, MetricsSnapshot};
pub use config::ClientConfig;
pub use error::{InsightsError, Result};
pub use transport::{AppContext, HttpTransport, QueryTransport};
pub use types::*;

/// Re-export for convenience
pub mod prelude {
    pub use super::{AppContext, InsightsClient, InsightsError, QueryTransport, Result};
    pub use super::types::*;
}
