//! Transform pipeline error types

use thiserror::Error;

/// Errors that can occur while preparing a transform stage.
///
/// Per-cell failures never surface here; they degrade to visible error text
/// in the affected cell so one bad value cannot poison the whole table.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A replace-values rule does not contain exactly one unescaped `:`
    #[error("Malformed replace-values statement: '{0}'")]
    MalformedReplaceRule(String),

    /// A replace-values key carries a non-numeric column suffix
    #[error("Invalid replace-values column selector: '{0}'")]
    InvalidColumnSelector(String),
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;
