//! Request Dispatcher
//!
//! Turns a [`QueryRequest`] into a handler invocation: shape check, registry
//! lookup, execution, and wrapping of the result. Every handler failure is
//! reported as [`AppError::JobFailed`], whatever its cause.

use std::time::Instant;

use tracing::info;

use crate::jobs::JobRegistry;
use crate::models::{QueryRequest, QueryResponse};
use crate::types::{AppError, AppResult};

pub async fn dispatch(registry: &JobRegistry, request: QueryRequest) -> AppResult<QueryResponse> {
    if request.source.trim().is_empty() {
        return Err(AppError::BadRequest(
            "source: must be a non-empty string".to_string(),
        ));
    }

    let handler = registry
        .lookup(&request.source)
        .ok_or_else(|| AppError::UnknownSource {
            name: request.source.clone(),
            valid: registry.list_sources(),
        })?;

    info!(source = %request.source, params = request.params.len(), "Dispatching job");
    let started = Instant::now();

    let result = handler.execute(&request).await?;

    info!(
        source = %request.source,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Job completed"
    );

    Ok(QueryResponse {
        source: request.source,
        result,
    })
}
