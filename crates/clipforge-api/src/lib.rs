//! Axum HTTP API for ClipForge.
//!
//! Thin authenticated surface over the persistence layer, object store
//! and job queue: upload init, video CRUD, candidate listing, analyze
//! job submission and lifecycle, render submission and downloads. The
//! HTTP tier only produces rows and queue messages; it never touches
//! scratch disk or the media toolchain.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
