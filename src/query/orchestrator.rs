//! Query orchestrator
//!
//! Owns a query's lifecycle from variable merge to the final transformed
//! table:
//!
//! ```text
//! Unstarted -> PreProcessed -> Executed -> PostProcessed
//! ```
//!
//! Pre-processing resolves the time range and validates mandatory
//! parameters before any I/O happens; execution calls the datasource adapter
//! exactly once and memoizes the post-processed result, so the same query
//! object can back multiple template locations without duplicate cost.

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;

use crate::query::datasource::{Datasource, DatasourceRequest};
use crate::query::error::{QueryError, QueryResult};
use crate::timerange;
use crate::transform::{self, Table};
use crate::variables::{substitute, Variable, VariableCollection};

/// Default datasource timeout when no `timeout` option is set
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Lifecycle state of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Nothing resolved yet
    Unstarted,
    /// Time range resolved, parameters validated
    PreProcessed,
    /// Datasource responded
    Executed,
    /// Transform pipeline ran; result cached
    PostProcessed,
}

/// Drives one query through its lifecycle against a datasource adapter
pub struct QueryOrchestrator {
    datasource: Arc<dyn Datasource>,
    raw_query: String,
    variables: VariableCollection,
    reference_time: DateTime<FixedOffset>,
    from_expression: Option<String>,
    to_expression: Option<String>,
    state: QueryState,
    from: String,
    to: String,
    result: Option<Table>,
}

impl QueryOrchestrator {
    /// Create an orchestrator for a raw query against a datasource.
    ///
    /// The reference time must be the single instant shared by all queries
    /// of one report run, supplied by the report runner.
    pub fn new(
        datasource: Arc<dyn Datasource>,
        raw_query: impl Into<String>,
        reference_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            datasource,
            raw_query: raw_query.into(),
            variables: VariableCollection::new(),
            reference_time,
            from_expression: None,
            to_expression: None,
            state: QueryState::Unstarted,
            from: String::new(),
            to: String::new(),
            result: None,
        }
    }

    /// Set the raw from/to time expressions taken from the dashboard; `from`
    /// and `to` report attributes take precedence during pre-processing
    pub fn with_time_range(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from_expression = from;
        self.to_expression = to;
        self
    }

    /// Seed the variable collection (dashboard template variables)
    pub fn with_variables(mut self, variables: VariableCollection) -> Self {
        self.variables = variables;
        self
    }

    /// Merge document-level and call-site attributes into the variable
    /// collection; document attributes have the lower priority
    pub fn with_attributes(
        mut self,
        document: &[(String, String)],
        item: &[(String, String)],
    ) -> Self {
        self.variables = self.variables.merged_with(document, item);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Resolved from-time (after pre-processing)
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Resolved to-time (after pre-processing)
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Variable collection of this query
    pub fn variables(&self) -> &VariableCollection {
        &self.variables
    }

    /// Cached result, if the query already executed
    pub fn result(&self) -> Option<&Table> {
        self.result.as_ref()
    }

    /// Resolve the time range and validate mandatory parameters.
    ///
    /// Fails fast before any I/O: a missing query text or an unparseable
    /// date expression surfaces here. Idempotent once pre-processed.
    pub fn pre_process(&mut self) -> QueryResult<()> {
        if self.state != QueryState::Unstarted {
            return Ok(());
        }
        if self.raw_query.trim().is_empty() {
            return Err(QueryError::MissingQueryText);
        }

        let from_tz = self.timezone_option("from_timezone")?;
        let to_tz = self.timezone_option("to_timezone")?;
        // from/to report attributes override the dashboard time range
        let from_raw = self
            .variables
            .option_value("from")
            .or_else(|| self.from_expression.clone());
        let to_raw = self
            .variables
            .option_value("to")
            .or_else(|| self.to_expression.clone());
        self.from = timerange::translate(from_raw.as_deref(), self.reference_time, false, from_tz)?;
        self.to = timerange::translate(to_raw.as_deref(), self.reference_time, true, to_tz)?;

        // make the resolved range substitutable as $from / $to
        self.variables
            .insert("from", Variable::new(self.from.clone()).with_name("from"));
        self.variables
            .insert("to", Variable::new(self.to.clone()).with_name("to"));

        self.state = QueryState::PreProcessed;
        tracing::debug!(from = %self.from, to = %self.to, "query pre-processed");
        Ok(())
    }

    /// Execute the query once and return the transformed result.
    ///
    /// Idempotent: subsequent calls return the memoized result without
    /// re-running pre/post-processing or contacting the datasource.
    pub async fn execute(&mut self) -> QueryResult<Table> {
        if let Some(result) = &self.result {
            tracing::debug!("returning memoized query result");
            return Ok(result.clone());
        }

        self.pre_process()?;

        let query = substitute(&self.raw_query, &self.variables);
        tracing::debug!(
            datasource = self.datasource.name(),
            from = %self.from,
            to = %self.to,
            "executing query"
        );
        let table = self
            .datasource
            .request(DatasourceRequest {
                from: self.from.clone(),
                to: self.to.clone(),
                raw_query: query,
                variables: &self.variables,
                timeout: self.timeout(),
            })
            .await?;
        self.state = QueryState::Executed;

        let table = self.post_process(table)?;
        self.result = Some(table.clone());
        Ok(table)
    }

    /// Run the transform pipeline over the raw datasource result
    fn post_process(&mut self, table: Table) -> QueryResult<Table> {
        let table = transform::apply(table, &self.variables)?;
        self.state = QueryState::PostProcessed;
        Ok(table)
    }

    /// First cell of the cached result, for single-value template locations
    pub fn single_value(&self) -> Option<String> {
        self.result
            .as_ref()
            .and_then(|table| table.single_value())
            .map(|cell| cell.to_string())
    }

    /// Cached result rows with every cell stringified
    pub fn formatted_rows(&self) -> Vec<Vec<String>> {
        self.result
            .as_ref()
            .map(|table| table.rows_as_strings())
            .unwrap_or_default()
    }

    fn timezone_option(&self, key: &str) -> QueryResult<Option<Tz>> {
        self.variables
            .option_value(key)
            .map(|name| timerange::parse_timezone(&name))
            .transpose()
            .map_err(Into::into)
    }

    fn timeout(&self) -> Duration {
        let seconds = self
            .variables
            .option_value("timeout")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(seconds)
    }
}
