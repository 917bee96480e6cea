//! API routes.

use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::health::{health, ready};
use crate::handlers::jobs::{cancel_job, get_job, list_jobs, retry_job, start_analysis};
use crate::handlers::renders::{
    batch_render, create_render, delete_render, download_render, get_render, list_renders,
};
use crate::handlers::videos::{
    create_video, delete_video, get_video, init_upload, list_candidates, list_videos,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let video_routes = Router::new()
        .route("/uploads/init", post(init_upload))
        .route("/videos", post(create_video))
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id", delete(delete_video))
        .route("/videos/:video_id/candidates", get(list_candidates));

    let job_routes = Router::new()
        .route("/jobs/analyze", post(start_analysis))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id", delete(cancel_job))
        .route("/jobs/:job_id/retry", post(retry_job));

    let render_routes = Router::new()
        .route("/renders", post(create_render))
        .route("/renders", get(list_renders))
        .route("/renders/batch", post(batch_render))
        .route("/renders/:render_id", get(get_render))
        .route("/renders/:render_id", delete(delete_render))
        .route(
            "/renders/:render_id/download/:candidate_id/:aspect",
            get(download_render),
        );

    let api_routes = Router::new()
        .merge(video_routes)
        .merge(job_routes)
        .merge(render_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<axum::http::HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
