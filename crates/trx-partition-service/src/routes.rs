//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, partitions, transactions};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
///
/// Every request holds at most one pooled database connection at a time, so
/// this should stay in the same range as the pool size.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Transactions
/// - `POST /v1/partition` - Write a generated batch into the partitioned table
/// - `GET /v1/partition/:id/:user_id/:date` - Fetch from the partitioned table
/// - `POST /v1/no-partition` - Write a generated batch into the flat table
/// - `GET /v1/no-partition/:id/:user_id/:date` - Fetch from the flat table
///
/// ## Partitions
/// - `POST /v1/partitions` - Ensure a day's child table
/// - `GET /v1/partitions/:date` - Probe a day's child table
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Transactions
        .route("/partition", post(transactions::create_partitioned))
        .route(
            "/partition/:id/:user_id/:date",
            get(transactions::get_partitioned),
        )
        .route("/no-partition", post(transactions::create_unpartitioned))
        .route(
            "/no-partition/:id/:user_id/:date",
            get(transactions::get_unpartitioned),
        )
        // Partitions
        .route("/partitions", post(partitions::ensure_partition))
        .route("/partitions/:date", get(partitions::get_partition))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
