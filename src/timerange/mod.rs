//! Time-range translation
//!
//! Resolves the relative date expressions dashboards use for their time
//! pickers (`now-5d/w` style) against a report-wide reference instant. The
//! caller supplies one fixed reference timestamp per report run so every
//! expression in a document resolves consistently.

mod error;
mod resolver;

pub use error::{TimeRangeError, TimeRangeResult};
pub use resolver::{parse_timezone, translate};
