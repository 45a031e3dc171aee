// Query Executor - dispatches named jobs over HTTP

pub mod config;
pub mod dispatcher;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod search;    // External literature-search clients (arXiv)
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
