use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

use crate::dispatcher::dispatch;
use crate::models::{AppState, QueryRequest, QueryResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(run_query))
        .with_state(state)
}

/// POST /query - validate the body, then hand it to the dispatcher
async fn run_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> AppResult<Json<QueryResponse>> {
    // Missing fields, non-object params and bad JSON are client errors (400)
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let response = dispatch(&state.registry, request).await?;
    Ok(Json(response))
}
