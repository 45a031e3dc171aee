//! Job Registry
//!
//! Maps source keys (e.g. `arxiv.papers`) to job handlers. The registry is
//! filled once at startup and shared read-only afterwards, so lookups need no
//! synchronization.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::JobHandler;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Job source key must not be empty")]
    EmptySource,

    #[error("Job source already registered: {0}")]
    Duplicate(String),
}

#[derive(Default)]
pub struct JobRegistry {
    // BTreeMap keeps keys sorted for list_sources
    handlers: BTreeMap<String, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `source`. Each key maps to exactly one handler.
    pub fn register<H>(&mut self, source: impl Into<String>, handler: H) -> Result<(), RegistryError>
    where
        H: JobHandler + 'static,
    {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(RegistryError::EmptySource);
        }
        if self.handlers.contains_key(&source) {
            return Err(RegistryError::Duplicate(source));
        }

        info!(source = %source, "Registered job handler");
        self.handlers.insert(source, Arc::new(handler));
        Ok(())
    }

    /// Exact-match lookup, no aliasing or case folding.
    pub fn lookup(&self, source: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(source).cloned()
    }

    /// All registered keys in lexicographic order.
    pub fn list_sources(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
