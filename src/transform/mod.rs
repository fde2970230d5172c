//! Query result transformation
//!
//! Turns raw tabular datasource results into the shape a report asked for:
//!
//! - **Table / Cell**: the `{header, content}` result shape all datasources
//!   normalize to
//! - **format**: positional printf-style column formatting
//! - **replace**: regex / comparison / equality value replacement
//! - **pipeline**: the fixed-order stage driver
//!   (format → replace_values → filter_columns → transpose)
//!
//! Failures on individual cells become visible error text in the output;
//! only structurally malformed replace rules abort a run.

mod error;
mod format;
mod pipeline;
mod replace;
mod table;

pub use error::{TransformError, TransformResult};
pub use format::format_columns;
pub use pipeline::{apply, filter_columns, transpose};
pub use replace::{replace_values, ReplaceSpec};
pub use table::{Cell, Table};
