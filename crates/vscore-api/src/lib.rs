//! Axum HTTP API server.
//!
//! This crate provides:
//! - The generation endpoint a browser front end submits scripts/videos to
//! - Job progress polling and cancellation endpoints
//! - The analysis → submission → polling pipeline behind them

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::GeminiClient;
pub use state::AppState;
