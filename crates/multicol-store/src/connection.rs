//! The storage interface used by the session layer.

use multicol_core::{Column, Result, Row, Value};
use multicol_query::{Dialect, Select};

/// A relational store that can create tables, insert rows and run SELECTs.
///
/// Every call to [`Connection::query`] is one query for the purpose of
/// batching guarantees, and is reflected in [`Connection::query_count`].
pub trait Connection {
    /// The dialect used when rendering statements.
    fn dialect(&self) -> Dialect;

    /// Register a table.
    fn create_table(&mut self, table: &str, columns: Vec<Column>) -> Result<()>;

    /// Insert a row and return its primary key value.
    ///
    /// Missing auto-increment primary keys are generated.
    fn insert(&mut self, table: &str, values: Vec<(&str, Value)>) -> Result<Value>;

    /// Execute a SELECT.
    fn query(&self, select: &Select) -> Result<Vec<Row>>;

    /// Number of queries executed so far.
    fn query_count(&self) -> usize;
}
