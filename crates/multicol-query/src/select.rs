//! SELECT query description.
//!
//! A `Select` names a base table, its joins, a filter, an ordering and the
//! columns to return. The storage layer executes it; `build_with_dialect`
//! renders the equivalent SQL for logging.

use crate::clause::OrderBy;
use crate::expr::{Dialect, Expr, aliased_column};
use crate::join::Join;
use multicol_core::Value;

/// A SELECT query.
///
/// Result rows hold the base table's columns under their own names, followed
/// by the columns of every *included* join as `<alias>__<column>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    alias: Option<String>,
    joins: Vec<Join>,
    /// Join aliases whose columns are returned, with those columns.
    included: Vec<(String, Vec<String>)>,
    filter: Option<Expr>,
    order_by: Vec<OrderBy>,
    distinct: bool,
    limit: Option<u64>,
}

impl Select {
    /// Create a new SELECT over `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
            joins: Vec::new(),
            included: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            distinct: false,
            limit: None,
        }
    }

    /// Alias the base table.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add a WHERE condition (ANDed with any existing one).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Add ORDER BY clause.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Add several ORDER BY clauses.
    pub fn order_by_all(mut self, orders: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by.extend(orders);
        self
    }

    /// Add a JOIN clause.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add a JOIN clause and return `columns` of the joined table.
    pub fn join_included(mut self, join: Join, columns: Vec<String>) -> Self {
        self.included
            .push((join.effective_alias().to_string(), columns));
        self.joins.push(join);
        self
    }

    /// Return each distinct row once.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The name base-table columns are qualified with.
    pub fn base_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn included(&self) -> &[(String, Vec<String>)] {
        &self.included
    }

    pub fn filter_expr(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    /// Build the SQL string and parameters (default PostgreSQL dialect).
    pub fn build(&self) -> (String, Vec<Value>) {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the SQL string and parameters for a specific dialect.
    pub fn build_with_dialect(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let base = self.base_alias();

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        let mut projections = vec![format!("{}.*", dialect.quote_identifier(base))];
        for (alias, columns) in &self.included {
            for column in columns {
                projections.push(format!(
                    "{}.{} AS {}",
                    dialect.quote_identifier(alias),
                    dialect.quote_identifier(column),
                    dialect.quote_identifier(&aliased_column(alias, column))
                ));
            }
        }
        sql.push_str(&projections.join(", "));

        sql.push_str(" FROM ");
        sql.push_str(&dialect.quote_identifier(&self.table));
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&dialect.quote_identifier(alias));
        }

        for join in &self.joins {
            sql.push_str(&join.build_with_dialect(dialect, &mut params, 0));
        }

        if let Some(filter) = &self.filter {
            let where_sql = filter.build_with_dialect(dialect, &mut params, 0);
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.order_by.is_empty() {
            let orders: Vec<_> = self
                .order_by
                .iter()
                .map(|o| o.to_sql(dialect, &mut params))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        (sql, params)
    }
}
