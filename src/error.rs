//! Error handling for vispipe-rs
//!
//! Engine calls return [`PipelineError`](crate::pipeline::PipelineError)
//! directly. This module wraps it together with configuration, IO and
//! serialization failures for code that deals with more than the engine.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for vispipe-rs operations
#[derive(Error, Debug)]
pub enum VisPipeError {
    /// Errors from the pipeline engine
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisPipeError>,
    },
}

impl VisPipeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisPipeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for VisPipeError {
    fn from(err: serde_json::Error) -> Self {
        VisPipeError::Serialization(err.to_string())
    }
}

/// Result type alias for vispipe-rs operations
pub type Result<T> = std::result::Result<T, VisPipeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| VisPipeError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| VisPipeError::from(e).with_context(f()))
    }
}
