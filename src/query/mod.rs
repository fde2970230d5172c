//! Query lifecycle
//!
//! Ties the variable, time-range and transform layers together around a
//! datasource adapter:
//!
//! - **Datasource / DatasourceRegistry**: the async collaborator seam to the
//!   actual backends
//! - **QueryOrchestrator**: variable merge, pre-process, memoized execute,
//!   post-process
//!
//! # Examples
//!
//! ```rust,ignore
//! use dashreport::query::QueryOrchestrator;
//!
//! let mut query = QueryOrchestrator::new(datasource, "SELECT cpu FROM stats", report_time)
//!     .with_time_range(Some("now-6h".into()), Some("now".into()))
//!     .with_attributes(&document_attrs, &item_attrs);
//!
//! let table = query.execute().await?;
//! ```

mod datasource;
mod error;
mod orchestrator;

pub use datasource::{Datasource, DatasourceError, DatasourceRegistry, DatasourceRequest};
pub use error::{QueryError, QueryResult};
pub use orchestrator::{QueryOrchestrator, QueryState};
