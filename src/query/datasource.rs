//! Datasource collaborator seam
//!
//! The core never speaks a datasource wire protocol itself; adapters (SQL,
//! Graphite, InfluxDB, Prometheus, ...) implement [`Datasource`] and return
//! the normalized tabular shape. The [`DatasourceRegistry`] is an explicit
//! registry object constructed once at startup and passed by reference to
//! whatever needs to look up an adapter by type name.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::transform::Table;
use crate::variables::VariableCollection;

/// Parameters of one datasource request
#[derive(Debug)]
pub struct DatasourceRequest<'a> {
    /// Resolved from-time, epoch-millisecond string
    pub from: String,
    /// Resolved to-time, epoch-millisecond string
    pub to: String,
    /// Query text with all variables substituted
    pub raw_query: String,
    /// Variable collection of the owning query
    pub variables: &'a VariableCollection,
    /// Request timeout
    pub timeout: Duration,
}

/// A datasource adapter able to execute queries against a backend
#[async_trait]
pub trait Datasource: Send + Sync {
    /// Adapter type name, e.g. `mysql` or `prometheus`
    fn name(&self) -> &str;

    /// Execute the query and normalize the response to the tabular shape
    async fn request(&self, request: DatasourceRequest<'_>) -> Result<Table, DatasourceError>;
}

/// Errors raised by datasource adapters
#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    #[error("Datasource request failed: {0}")]
    Request(String),

    #[error("Unknown datasource type: {0}")]
    UnknownType(String),

    #[error("Invalid response from datasource: {0}")]
    InvalidResponse(String),
}

/// Lookup table from datasource type name to adapter
#[derive(Default, Clone)]
pub struct DatasourceRegistry {
    sources: HashMap<String, Arc<dyn Datasource>>,
}

impl DatasourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its type name
    pub fn register(&mut self, datasource: Arc<dyn Datasource>) {
        self.sources
            .insert(datasource.name().to_string(), datasource);
    }

    /// Look up an adapter by type name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Datasource>, DatasourceError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| DatasourceError::UnknownType(name.to_string()))
    }

    /// Registered type names
    pub fn names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for DatasourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasourceRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource;

    #[async_trait]
    impl Datasource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn request(
            &self,
            _request: DatasourceRequest<'_>,
        ) -> Result<Table, DatasourceError> {
            Ok(Table::empty())
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = DatasourceRegistry::new();
        registry.register(Arc::new(FakeSource));

        assert!(registry.get("fake").is_ok());
        assert!(matches!(
            registry.get("missing"),
            Err(DatasourceError::UnknownType(_))
        ));
    }
}
