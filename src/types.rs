// Error kinds shared by the dispatcher and job handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Failure raised from inside a job handler.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid params for {job}: {details}")]
    ValidationFailed { job: String, details: String },

    #[error("Upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn validation(job: &str, details: impl Into<String>) -> Self {
        JobError::ValidationFailed {
            job: job.to_string(),
            details: details.into(),
        }
    }
}

/// Error returned to HTTP clients. The status code is picked from the variant.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unknown source: {name}. Valid sources: {}", format_source_list(.valid))]
    UnknownSource { name: String, valid: Vec<String> },

    #[error("Job execution failed: {0}")]
    JobFailed(#[from] JobError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::UnknownSource { .. } => StatusCode::BAD_REQUEST,
            AppError::JobFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), %detail, "Query failed");
        } else {
            warn!(status = status.as_u16(), %detail, "Query rejected");
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

/// Render sources as a bracketed, quoted list: `['a', 'b']`.
pub fn format_source_list(sources: &[String]) -> String {
    let quoted: Vec<String> = sources.iter().map(|s| format!("'{}'", s)).collect();
    format!("[{}]", quoted.join(", "))
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_source_list() {
        assert_eq!(format_source_list(&[]), "[]");
        assert_eq!(
            format_source_list(&["arxiv.papers".to_string(), "zeta.job".to_string()]),
            "['arxiv.papers', 'zeta.job']"
        );
    }

    #[test]
    fn test_unknown_source_message() {
        let err = AppError::UnknownSource {
            name: "unknown.job".to_string(),
            valid: vec!["arxiv.papers".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown source: unknown.job. Valid sources: ['arxiv.papers']"
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_job_failures_map_to_500() {
        let err = AppError::from(JobError::validation("arxiv.papers", "max_results: out of range"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Job execution failed: Invalid params for arxiv.papers: max_results: out of range"
        );

        let err = AppError::from(JobError::UpstreamFailure("connection reset".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_bad_request_is_400() {
        let err = AppError::BadRequest("source must not be empty".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
