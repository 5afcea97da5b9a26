//! Storage-layer configuration.

use multicol_query::Dialect;
use serde::{Deserialize, Serialize};

/// Configuration for a [`MemoryConnection`](crate::MemoryConnection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Dialect used when rendering queries for logs and the capture buffer.
    pub dialect: Dialect,
    /// Keep every executed statement in memory (see `captured_queries`).
    pub capture_queries: bool,
    /// Emit each rendered statement at TRACE level.
    pub log_sql: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            capture_queries: false,
            log_sql: true,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rendering dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Enable or disable query capture.
    pub fn capture_queries(mut self, value: bool) -> Self {
        self.capture_queries = value;
        self
    }

    /// Enable or disable TRACE logging of statements.
    pub fn log_sql(mut self, value: bool) -> Self {
        self.log_sql = value;
        self
    }

    /// Does any consumer need the rendered SQL?
    pub(crate) fn renders_sql(&self) -> bool {
        self.capture_queries || self.log_sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StoreConfig::new()
            .dialect(Dialect::Sqlite)
            .capture_queries(true)
            .log_sql(false);
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert!(config.capture_queries);
        assert!(config.renders_sql());
        assert!(!StoreConfig::new().log_sql(false).renders_sql());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"dialect":"Mysql","capture_queries":true}"#).unwrap();
        assert_eq!(config.dialect, Dialect::Mysql);
        assert!(config.capture_queries);
        assert!(config.log_sql);
    }
}
