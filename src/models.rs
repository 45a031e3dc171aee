use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::jobs::JobRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<JobRegistry>,
}

impl AppState {
    pub fn new(config: Config, registry: JobRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }
}

/// Body of `POST /query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Job source key, e.g. `arxiv.papers`
    pub source: String,
    /// Job-specific parameters, validated by the selected handler
    pub params: Map<String, Value>,
}

impl QueryRequest {
    pub fn new(source: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            source: source.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub source: String,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
