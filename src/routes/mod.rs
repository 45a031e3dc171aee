//! API Routes
//!
//! - `GET /health` - liveness probe
//! - `GET /sources` - registered job source keys
//! - `POST /query` - run a job by source key

pub mod health;
pub mod query;
pub mod sources;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{catch_panic_layer, cors_layer};
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!(
        sources = state.registry.len(),
        "Creating application router"
    );

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(health::router())
        .merge(sources::router(state.clone()))
        .merge(query::router(state))
        // Handler panics become 500 "Job execution failed" responses
        .layer(catch_panic_layer())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
