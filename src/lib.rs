//! # Dashreport
//!
//! Core engine for rendering live dashboard data into documents: variable
//! substitution, relative time-range resolution, and tabular result
//! transforms.
//!
//! ## Features
//!
//! - **Variable formatting**: 13+ output formats with exact escaping rules
//!   (CSV, JSON, regex, Lucene, SQL strings, percent-encoding, ...)
//! - **Template substitution**: bounded-depth `$name` / `${name:format}`
//!   placeholder replacement
//! - **Time-range translation**: `now-5d/w`-style relative expressions
//!   resolved against one report-wide reference instant
//! - **Transform pipeline**: format → replace → filter → transpose over
//!   tabular results, with per-cell error isolation
//! - **Query lifecycle**: memoized execution against pluggable datasource
//!   adapters
//!
//! ## Modules
//!
//! - [`variables`]: value carriers, formatting and substitution
//! - [`timerange`]: relative date expression resolver
//! - [`transform`]: tabular result transformation pipeline
//! - [`query`]: datasource seam and query orchestration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::DateTime;
//! use dashreport::query::QueryOrchestrator;
//! use std::sync::Arc;
//!
//! # async fn run(datasource: Arc<dyn dashreport::query::Datasource>) -> Result<(), Box<dyn std::error::Error>> {
//! // One fixed reference instant per report run keeps every relative
//! // time expression in the document consistent.
//! let report_time = DateTime::parse_from_rfc3339("2024-05-01T08:00:00+02:00")?;
//!
//! let mut query = QueryOrchestrator::new(
//!     datasource,
//!     "SELECT host, cpu FROM stats WHERE env = '$env'",
//!     report_time,
//! )
//! .with_time_range(Some("now-7d".into()), Some("now".into()))
//! .with_attributes(
//!     &[("var-env".into(), "prod".into())],
//!     &[("filter_columns".into(), "host".into())],
//! );
//!
//! let table = query.execute().await?;
//! println!("{} rows", table.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod query;
pub mod timerange;
pub mod transform;
pub mod variables;

// Re-export top-level types for convenience
pub use variables::{
    substitute, Variable, VariableCollection, VariableDefinition, VariableOption, VariableValue,
};

pub use timerange::{translate, TimeRangeError, TimeRangeResult};

pub use transform::{Cell, Table, TransformError, TransformResult};

pub use query::{
    Datasource, DatasourceError, DatasourceRegistry, DatasourceRequest, QueryError,
    QueryOrchestrator, QueryResult, QueryState,
};

pub use config::{Config, ConfigError, DashboardConfig, LoggingConfig};
