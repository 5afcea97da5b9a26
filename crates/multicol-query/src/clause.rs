//! ORDER BY clause and in-memory row ordering.

use crate::expr::{Dialect, Expr};
use multicol_core::{Error, QueryErrorKind, Result, Row, Value};
use std::cmp::Ordering;

/// ORDER BY clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: OrderDirection,
    pub nulls: Option<NullsOrder>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// NULLS FIRST/LAST ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl OrderBy {
    /// Create an ascending order by clause on a column.
    pub fn asc(column: impl Into<String>) -> Self {
        Expr::col(column).asc()
    }

    /// Create a descending order by clause on a column.
    pub fn desc(column: impl Into<String>) -> Self {
        Expr::col(column).desc()
    }

    /// Parse a declared ordering entry: `"name"`, `"date_joined DESC"`.
    ///
    /// A leading `-` also means descending. The column is qualified with
    /// `table` when given.
    pub fn parse(entry: &str, table: Option<&str>) -> Result<Self> {
        let mut parts = entry.split_whitespace();
        let Some(raw_column) = parts.next() else {
            return Err(Error::query(
                QueryErrorKind::InvalidLookup,
                "empty ordering entry",
            ));
        };
        let (column, mut direction) = match raw_column.strip_prefix('-') {
            Some(rest) => (rest, OrderDirection::Desc),
            None => (raw_column, OrderDirection::Asc),
        };
        match parts.next().map(str::to_ascii_uppercase).as_deref() {
            None => {}
            Some("ASC") => direction = OrderDirection::Asc,
            Some("DESC") => direction = OrderDirection::Desc,
            Some(other) => {
                return Err(Error::query(
                    QueryErrorKind::InvalidLookup,
                    format!("unknown ordering direction '{other}' in '{entry}'"),
                ));
            }
        }
        if parts.next().is_some() || column.is_empty() {
            return Err(Error::query(
                QueryErrorKind::InvalidLookup,
                format!("malformed ordering entry '{entry}'"),
            ));
        }
        let expr = match table {
            Some(t) => Expr::qualified(t, column),
            None => Expr::col(column),
        };
        Ok(Self {
            expr,
            direction,
            nulls: None,
        })
    }

    /// Set NULLS FIRST.
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    /// Set NULLS LAST.
    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    /// Generate SQL for this ORDER BY clause.
    pub fn to_sql(&self, dialect: Dialect, params: &mut Vec<Value>) -> String {
        let mut sql = self.expr.build_with_dialect(dialect, params, 0);

        sql.push_str(match self.direction {
            OrderDirection::Asc => " ASC",
            OrderDirection::Desc => " DESC",
        });

        if let Some(nulls) = self.nulls {
            sql.push_str(match nulls {
                NullsOrder::First => " NULLS FIRST",
                NullsOrder::Last => " NULLS LAST",
            });
        }

        sql
    }

    /// Compare two already-evaluated sort values.
    ///
    /// Without an explicit NULLS clause NULL sorts lowest, so it comes first
    /// ascending and last descending.
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        if let Some(nulls) = self.nulls {
            match (a.is_null(), b.is_null()) {
                (true, true) => return Ordering::Equal,
                (true, false) => {
                    return if nulls == NullsOrder::First {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    };
                }
                (false, true) => {
                    return if nulls == NullsOrder::First {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                }
                (false, false) => {}
            }
        }
        let ord = a.sort_cmp(b);
        match self.direction {
            OrderDirection::Asc => ord,
            OrderDirection::Desc => ord.reverse(),
        }
    }
}

/// Stable-sort rows by an ORDER BY list.
///
/// Sort keys are evaluated once per row; rows with equal keys keep their
/// input order.
pub fn sort_rows(rows: Vec<Row>, order_by: &[OrderBy], base: &str) -> Result<Vec<Row>> {
    if order_by.is_empty() || rows.len() < 2 {
        return Ok(rows);
    }
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let keys = order_by
                .iter()
                .map(|o| o.expr.eval(&row, base))
                .collect::<Result<Vec<_>>>()?;
            Ok((keys, row))
        })
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(a, _), (b, _)| {
        order_by
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(o, (x, y))| o.compare(x, y))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}
