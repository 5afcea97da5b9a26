//! In-memory relational store.
//!
//! Tables are vectors of rows. Queries run as nested-loop joins followed by
//! filtering, a stable sort, projection, DISTINCT and LIMIT, in that order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use multicol_core::{
    Column, ColumnInfo, Error, QueryErrorKind, Result, Row, SchemaErrorKind, TypeError, Value,
};
use multicol_query::{Dialect, JoinType, Select, aliased_column, sort_rows};

use crate::config::StoreConfig;
use crate::connection::Connection;

/// A statement recorded while `capture_queries` is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug)]
struct Table {
    columns: Vec<Column>,
    info: Arc<ColumnInfo>,
    rows: Vec<Vec<Value>>,
    next_id: i64,
}

impl Table {
    fn new(columns: Vec<Column>) -> Self {
        let info = Arc::new(ColumnInfo::new(
            columns.iter().map(|c| c.name.clone()).collect(),
        ));
        Self {
            columns,
            info,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn primary_key_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }
}

/// An in-memory [`Connection`].
#[derive(Debug)]
pub struct MemoryConnection {
    config: StoreConfig,
    tables: HashMap<String, Table>,
    query_count: AtomicUsize,
    captured: Mutex<Vec<CapturedQuery>>,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnection {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with the given configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            tables: HashMap::new(),
            query_count: AtomicUsize::new(0),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Reset the query counter to zero.
    pub fn reset_query_count(&self) {
        self.query_count.store(0, Ordering::Relaxed);
    }

    /// Statements recorded since creation or the last `clear_captured`.
    pub fn captured_queries(&self) -> Vec<CapturedQuery> {
        self.captured
            .lock()
            .map(|captured| captured.clone())
            .unwrap_or_default()
    }

    pub fn clear_captured(&self) {
        if let Ok(mut captured) = self.captured.lock() {
            captured.clear();
        }
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.table(table)?.rows.len())
    }

    /// Does a table named `table` exist?
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    fn record(&self, select: &Select) {
        if !self.config.renders_sql() {
            return;
        }
        let (sql, params) = select.build_with_dialect(self.config.dialect);
        if self.config.log_sql {
            tracing::trace!(sql = %sql, params = ?params, "Executing query");
        }
        if self.config.capture_queries {
            if let Ok(mut captured) = self.captured.lock() {
                captured.push(CapturedQuery { sql, params });
            }
        }
    }

    fn execute(&self, select: &Select) -> Result<Vec<Row>> {
        let base_alias = select.base_alias();
        let base = self.table(select.table())?;

        let mut info = Arc::clone(&base.info);
        let mut rows: Vec<Row> = base
            .rows
            .iter()
            .map(|values| Row::with_columns(Arc::clone(&info), values.clone()))
            .collect();

        for join in select.joins() {
            let joined = self.table(&join.table)?;
            let alias = join.effective_alias();

            let mut names = info.names().to_vec();
            names.extend(joined.columns.iter().map(|c| aliased_column(alias, &c.name)));
            let joined_info = Arc::new(ColumnInfo::new(names));

            let mut next = Vec::with_capacity(rows.len());
            for row in &rows {
                let mut matched = false;
                for candidate in &joined.rows {
                    let mut values: Vec<Value> = row.values().cloned().collect();
                    values.extend(candidate.iter().cloned());
                    let combined = Row::with_columns(Arc::clone(&joined_info), values);
                    if join.on.matches(&combined, base_alias)? {
                        matched = true;
                        next.push(combined);
                    }
                }
                if !matched && join.join_type == JoinType::Left {
                    let mut values: Vec<Value> = row.values().cloned().collect();
                    values.extend(std::iter::repeat_n(Value::Null, joined.columns.len()));
                    next.push(Row::with_columns(Arc::clone(&joined_info), values));
                }
            }
            rows = next;
            info = joined_info;
        }

        if let Some(filter) = select.filter_expr() {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if filter.matches(&row, base_alias)? {
                    kept.push(row);
                }
            }
            rows = kept;
        }

        let rows = sort_rows(rows, select.ordering(), base_alias)?;
        let mut rows = project(rows, &base.info, select.included(), &info)?;

        if select.is_distinct() {
            let mut unique: Vec<Row> = Vec::with_capacity(rows.len());
            for row in rows {
                if !unique.contains(&row) {
                    unique.push(row);
                }
            }
            rows = unique;
        }

        if let Some(limit) = select.limit_value() {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        Ok(rows)
    }
}

/// Keep the base table's columns plus the included join columns.
fn project(
    rows: Vec<Row>,
    base: &ColumnInfo,
    included: &[(String, Vec<String>)],
    wide: &ColumnInfo,
) -> Result<Vec<Row>> {
    let mut names: Vec<String> = base.names().to_vec();
    let mut indices: Vec<usize> = (0..base.len()).collect();
    for (alias, columns) in included {
        for column in columns {
            let name = aliased_column(alias, column);
            let index = wide.index_of(&name).ok_or_else(|| {
                Error::query(
                    QueryErrorKind::UnknownColumn,
                    format!("join '{alias}' has no column '{column}'"),
                )
            })?;
            names.push(name);
            indices.push(index);
        }
    }

    if indices.len() == wide.len() {
        return Ok(rows);
    }

    let info = Arc::new(ColumnInfo::new(names));
    Ok(rows
        .into_iter()
        .map(|row| {
            let values = indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect();
            Row::with_columns(Arc::clone(&info), values)
        })
        .collect())
}

impl Connection for MemoryConnection {
    fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    fn create_table(&mut self, table: &str, columns: Vec<Column>) -> Result<()> {
        if self.tables.contains_key(table) {
            return Err(Error::schema(
                SchemaErrorKind::TableExists,
                format!("table '{}' already exists", table),
            ));
        }
        tracing::debug!(table, columns = columns.len(), "Creating table");
        self.tables.insert(table.to_string(), Table::new(columns));
        Ok(())
    }

    fn insert(&mut self, table: &str, values: Vec<(&str, Value)>) -> Result<Value> {
        let stored = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::table_not_found(table))?;

        let mut row = vec![Value::Null; stored.columns.len()];
        for (name, value) in values {
            let index = stored
                .info
                .index_of(name)
                .ok_or_else(|| Error::column_not_found(table, name))?;
            row[index] = value;
        }

        // The sequence only advances once the row is accepted. It saturates
        // at i64::MAX; the primary key check then rejects a repeat.
        let mut next_id = stored.next_id;
        for (index, column) in stored.columns.iter().enumerate() {
            if row[index].is_null() && column.auto_increment {
                row[index] = Value::BigInt(next_id);
                next_id = next_id.saturating_add(1);
            }
            let value = &row[index];
            if value.is_null() && !column.nullable {
                return Err(Error::query(
                    QueryErrorKind::Storage,
                    format!("NULL in non-nullable column '{}.{}'", table, column.name),
                ));
            }
            if !column.sql_type.accepts(value) {
                return Err(Error::Type(TypeError {
                    expected: column.sql_type.sql_name(),
                    actual: value.type_name().to_string(),
                    column: Some(column.name.clone()),
                    rust_type: None,
                }));
            }
            if column.auto_increment {
                if let Some(id) = value.as_i64() {
                    next_id = next_id.max(id.saturating_add(1));
                }
            }
        }

        let pk = stored.primary_key_indices();
        if !pk.is_empty() {
            let duplicate = stored.rows.iter().any(|existing| {
                pk.iter()
                    .all(|&i| existing[i].sql_eq(&row[i]) == Some(true))
            });
            if duplicate {
                return Err(Error::query(
                    QueryErrorKind::Storage,
                    format!("duplicate primary key in '{}'", table),
                ));
            }
        }

        let key = match pk.as_slice() {
            [single] => row[*single].clone(),
            [] => Value::Null,
            many => Value::Json(serde_json::to_value(
                many.iter().map(|&i| row[i].clone()).collect::<Vec<_>>(),
            )?),
        };
        tracing::trace!(table, key = ?key, "Inserted row");
        stored.next_id = next_id;
        stored.rows.push(row);
        Ok(key)
    }

    fn query(&self, select: &Select) -> Result<Vec<Row>> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.record(select);
        self.execute(select)
    }

    fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multicol_core::SqlType;
    use multicol_query::Expr;

    fn column(name: &str, sql_type: SqlType) -> Column {
        Column {
            name: name.to_string(),
            sql_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    fn country_store() -> MemoryConnection {
        let mut conn = MemoryConnection::new();
        let mut id = column("id", SqlType::BigInt);
        id.primary_key = true;
        id.auto_increment = true;
        conn.create_table("country", vec![id, column("name", SqlType::Text)])
            .unwrap();
        conn
    }

    #[test]
    fn test_auto_increment_and_explicit_ids() {
        let mut conn = country_store();
        let usa = conn
            .insert("country", vec![("name", Value::from("United States"))])
            .unwrap();
        assert_eq!(usa, Value::BigInt(1));
        let explicit = conn
            .insert(
                "country",
                vec![("id", Value::BigInt(10)), ("name", Value::from("X"))],
            )
            .unwrap();
        assert_eq!(explicit, Value::BigInt(10));
        let next = conn
            .insert("country", vec![("name", Value::from("Y"))])
            .unwrap();
        assert_eq!(next, Value::BigInt(11));
        assert_eq!(conn.row_count("country").unwrap(), 3);
    }

    #[test]
    fn test_insert_validation() {
        let mut conn = country_store();
        assert!(conn.insert("nope", vec![]).is_err());
        assert!(
            conn.insert("country", vec![("missing", Value::from("x"))])
                .is_err()
        );
        assert!(conn.insert("country", vec![]).is_err());
        assert!(matches!(
            conn.insert("country", vec![("name", Value::BigInt(3))]),
            Err(Error::Type(_))
        ));
        conn.insert(
            "country",
            vec![("id", Value::BigInt(1)), ("name", Value::from("a"))],
        )
        .unwrap();
        assert!(
            conn.insert(
                "country",
                vec![("id", Value::Int(1)), ("name", Value::from("b"))]
            )
            .is_err()
        );
    }

    #[test]
    fn test_explicit_max_id_saturates_sequence() {
        let mut conn = country_store();
        let max = conn
            .insert(
                "country",
                vec![("id", Value::BigInt(i64::MAX)), ("name", Value::from("Last"))],
            )
            .unwrap();
        assert_eq!(max, Value::BigInt(i64::MAX));

        // The next generated id repeats i64::MAX and is refused.
        assert!(matches!(
            conn.insert("country", vec![("name", Value::from("Overflow"))]),
            Err(Error::Query(ref e)) if e.kind == QueryErrorKind::Storage
        ));
        assert_eq!(conn.row_count("country").unwrap(), 1);
    }

    #[test]
    fn test_rejected_insert_keeps_sequence() {
        let mut conn = country_store();
        assert!(conn.insert("country", vec![("name", Value::BigInt(3))]).is_err());
        assert!(conn.insert("country", vec![]).is_err());
        let first = conn
            .insert("country", vec![("name", Value::from("USSR"))])
            .unwrap();
        assert_eq!(first, Value::BigInt(1));

        assert!(
            conn.insert(
                "country",
                vec![("id", Value::BigInt(1)), ("name", Value::from("dup"))]
            )
            .is_err()
        );
        let second = conn
            .insert("country", vec![("name", Value::from("USA"))])
            .unwrap();
        assert_eq!(second, Value::BigInt(2));
    }

    #[test]
    fn test_create_table_twice_fails() {
        let mut conn = country_store();
        assert!(matches!(
            conn.create_table("country", vec![]),
            Err(Error::Schema(ref e)) if e.kind == SchemaErrorKind::TableExists
        ));
    }

    #[test]
    fn test_query_counts_and_capture() {
        let mut conn =
            MemoryConnection::with_config(StoreConfig::new().capture_queries(true));
        conn.create_table("country", vec![column("name", SqlType::Text)])
            .unwrap();
        conn.insert("country", vec![("name", Value::from("USSR"))])
            .unwrap();

        let rows = conn
            .query(&Select::new("country").filter(Expr::col("name").eq("USSR")))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(conn.query_count(), 1);

        let captured = conn.captured_queries();
        assert_eq!(captured.len(), 1);
        assert_eq!(
            captured[0].sql,
            "SELECT \"country\".* FROM \"country\" WHERE \"name\" = $1"
        );

        conn.reset_query_count();
        conn.clear_captured();
        assert_eq!(conn.query_count(), 0);
        assert!(conn.captured_queries().is_empty());
    }
}
