//! Axum HTTP server.
//!
//! This crate provides:
//! - Upload intake: stages the raw file and hands it to the pipeline
//! - Job status queries and static serving of finished artifacts
//! - Health and readiness checks and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
