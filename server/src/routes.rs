use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::metadata::{get, set};
use crate::state::AppState;

/// Request body limit when none is configured (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Permissive CORS: any origin, preflight cached for ten minutes.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-api-key"),
            header::AUTHORIZATION,
        ])
        .max_age(Duration::from_secs(600))
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let metadata_routes = Router::new()
        .route("/set", axum::routing::post(set::set_metadata))
        .route("/get", axum::routing::post(get::get_metadata))
        .layer(DefaultBodyLimit::max(max_body_bytes));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(metadata_routes)
        .merge(health)
        .layer(cors_layer())
        .with_state(state)
}

/// Liveness check; touches no dependencies.
async fn health_check() -> &'static str {
    "Ok!"
}
