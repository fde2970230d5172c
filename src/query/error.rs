//! Query error types
//!
//! Defines all error conditions that can occur during a query's lifecycle.
//! Callers are expected to catch these and render them as inline error text;
//! nothing here is fatal to the surrounding report run.

use thiserror::Error;

/// Errors that can occur during query orchestration
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query has no text to execute
    #[error("Missing mandatory query text")]
    MissingQueryText,

    /// From/to expression could not be resolved
    #[error("Time range error: {0}")]
    TimeRange(#[from] crate::timerange::TimeRangeError),

    /// Transform pipeline rejected its configuration
    #[error("Transform error: {0}")]
    Transform(#[from] crate::transform::TransformError),

    /// Datasource adapter failed
    #[error("Datasource error: {0}")]
    Datasource(#[from] crate::query::DatasourceError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
