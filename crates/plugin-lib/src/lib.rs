//! Kubecost cost source plugin library
//!
//! This crate provides:
//! - Translation of resource selectors and time windows into Kubecost
//!   allocation queries
//! - Normalization of allocation responses into canonical cost points
//! - Daily-average monthly projections and spec-cost predictions
//! - The CostSource gRPC service, health tracking and observability

pub mod aggregate;
pub mod allocation;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod proto;
pub mod query;
pub mod selector;
pub mod server;
pub mod version;
pub mod window;

pub use client::KubecostClient;
pub use config::PluginConfig;
pub use error::{CostError, Result};
pub use health::{ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{PluginMetrics, StructuredLogger};
pub use server::CostSourceService;
pub use window::{WindowResolver, WindowSpec};
