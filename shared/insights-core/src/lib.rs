//! Insights Core - shared service infrastructure
//!
//! This crate provides:
//! - The lifecycle trait every insights service implements
//! - Error handling utilities
//! - Configuration management

pub mod config;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use service::{DependencyStatus, HealthStatus, InsightsService, MicroserviceRuntime, ReadinessStatus};
