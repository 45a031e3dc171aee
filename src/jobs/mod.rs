//! Jobs
//!
//! A job is a named unit of work reachable through `POST /query`. Every job
//! implements [`JobHandler`] and is registered under its source key in the
//! [`JobRegistry`] at startup:
//!
//! - `arxiv.papers` - search arXiv for paper metadata
//!
//! Handlers receive the raw parameter bag and are expected to parse it into
//! their own typed schema on entry (see [`parse_params`]).

pub mod arxiv_papers;
pub mod registry;

pub use arxiv_papers::ArxivPapersJob;
pub use registry::{JobRegistry, RegistryError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

use crate::config::ArxivConfig;
use crate::models::QueryRequest;
use crate::search::ArxivClient;
use crate::types::JobError;

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, request: &QueryRequest) -> Result<Value, JobError>;
}

/// Build the registry with every job this service ships.
pub fn default_registry(config: &ArxivConfig) -> anyhow::Result<JobRegistry> {
    let client = ArxivClient::from_config(config)?;

    let mut registry = JobRegistry::new();
    registry.register(arxiv_papers::SOURCE, ArxivPapersJob::new(client))?;

    Ok(registry)
}

/// Deserialize and validate a job's parameters, failing with
/// [`JobError::ValidationFailed`] on the first problem.
pub fn parse_params<P>(job: &str, params: &Map<String, Value>) -> Result<P, JobError>
where
    P: DeserializeOwned + Validate,
{
    let parsed: P = serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| JobError::validation(job, e.to_string()))?;

    parsed
        .validate()
        .map_err(|errors| JobError::validation(job, describe_validation_errors(&errors)))?;

    Ok(parsed)
}

/// Flatten validator output into `field: message` pairs, sorted by field.
fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors.iter() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());

            // Struct-level checks carry their own field names in the message
            if field == "__all__" {
                lines.push(message);
            } else {
                lines.push(format!("{}: {}", field, message));
            }
        }
    }

    lines.sort();
    lines.join("; ")
}
