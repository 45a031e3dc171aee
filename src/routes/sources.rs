use axum::{extract::State, routing::get, Json, Router};

use crate::models::{AppState, SourcesResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sources", get(list_sources))
        .with_state(state)
}

async fn list_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: state.registry.list_sources(),
    })
}
