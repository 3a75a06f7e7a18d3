//! Read and clear model-endpoint monitoring records.
//!
//! Endpoint rows live in a KV table per project; per-second latency and
//! prediction counts live in a time-series table. [`build_router`] exposes
//! both under `/api/projects/{project}/model-endpoints`.

pub mod config;
pub mod endpoint_metrics;
pub mod error;
pub mod features;
pub mod filters;
pub mod handlers;
pub mod metrics;
pub mod query;
pub mod records;
pub mod secrets;
pub mod seed;
pub mod service;
pub mod state;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

pub use config::StoreConfig;
pub use error::ApiError;
pub use state::AppState;

use crate::handlers::{clear_endpoint, get_endpoint, healthz, list_endpoints};
use crate::metrics::{metrics_handler, track_requests};

pub fn build_router(st: AppState) -> Router {
    let endpoint_routes = Router::new()
        .route("/projects/:project/model-endpoints", get(list_endpoints))
        .route(
            "/projects/:project/model-endpoints/:endpoint_id",
            get(get_endpoint),
        )
        .route(
            "/projects/:project/model-endpoints/:endpoint_id/clear",
            delete(clear_endpoint).post(clear_endpoint),
        );

    let api_routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .merge(endpoint_routes)
        .layer(middleware::from_fn_with_state(st.clone(), track_requests))
        .with_state(st);

    Router::new().nest("/api", api_routes)
}
