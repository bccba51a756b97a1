//! Error handling for the severity pipeline.
//!
//! Every failure is fatal for a run. The variants mirror the three contract
//! violations the pipeline can detect (configuration, schema, reconciliation)
//! plus the I/O and serialization failures of the surrounding file handling.

pub mod util;

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or malformed dictionary resource or configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Label column absent, row length mismatch or non-numeric feature
    #[error("Schema error: {0}")]
    Schema(String),

    /// A classified row could not be linked back to its source case
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    /// The classifier collaborator rejected its input or state
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error writing Parquet output
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error assembling Arrow record batches
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error (de)serializing JSON artefacts such as the saved model
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a reconciliation error
    pub fn reconciliation(message: impl Into<String>) -> Self {
        Self::Reconciliation(message.into())
    }

    /// Create a classifier error
    pub fn classifier(message: impl Into<String>) -> Self {
        Self::Classifier(message.into())
    }

    /// Wrap an I/O error with a message describing what was being attempted
    pub fn io_with_context(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io(io::Error::new(
            source.kind(),
            format!("{}: {source}", context.into()),
        ))
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
