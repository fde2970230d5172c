//! Time-range error types

use thiserror::Error;

/// Errors that can occur while resolving time-range expressions
#[derive(Error, Debug)]
pub enum TimeRangeError {
    /// Expression does not match the `now[-<count><unit>][/<unit>]` grammar
    #[error("Unknown time range expression: '{0}'")]
    UnknownExpression(String),

    /// Timezone name not found in the tz database
    #[error("Unknown timezone: '{0}'")]
    UnknownTimezone(String),
}

/// Result type for time-range operations
pub type TimeRangeResult<T> = Result<T, TimeRangeError>;
