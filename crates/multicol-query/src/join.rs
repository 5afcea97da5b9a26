//! JOIN clauses and composite join conditions.
//!
//! A [`JoinCondition`] is built from the column pairs of one composite
//! foreign key. The same condition serves both directions of the
//! relationship: joining the parent onto its children, joining children onto
//! a parent, or binding either side to concrete key values.

use crate::expr::{Dialect, Expr};
use multicol_core::{ColumnPair, CompositeKey, Row, Value};

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Type of join
    pub join_type: JoinType,
    /// Table to join
    pub table: String,
    /// Optional table alias
    pub alias: Option<String>,
    /// ON condition
    pub on: Expr,
}

/// Types of SQL joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    /// Get the SQL keyword for this join type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

impl Join {
    /// Create an INNER JOIN.
    pub fn inner(table: impl Into<String>, on: Expr) -> Self {
        Self {
            join_type: JoinType::Inner,
            table: table.into(),
            alias: None,
            on,
        }
    }

    /// Create a LEFT JOIN.
    pub fn left(table: impl Into<String>, on: Expr) -> Self {
        Self {
            join_type: JoinType::Left,
            table: table.into(),
            alias: None,
            on,
        }
    }

    /// Set an alias for the joined table.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name this join's columns are qualified with.
    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Generate SQL and collect parameters with a specific dialect.
    pub fn build_with_dialect(
        &self,
        dialect: Dialect,
        params: &mut Vec<Value>,
        offset: usize,
    ) -> String {
        let mut sql = format!(
            " {} {}",
            self.join_type.as_str(),
            dialect.quote_identifier(&self.table)
        );
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&dialect.quote_identifier(alias));
        }
        let on_sql = self.on.build_with_dialect(dialect, params, offset);
        sql.push_str(" ON ");
        sql.push_str(&on_sql);
        sql
    }
}

/// Which end of a composite foreign key an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The referencing table (holds the foreign key columns).
    Child,
    /// The referenced table.
    Parent,
}

impl Side {
    pub const fn opposite(self) -> Self {
        match self {
            Side::Child => Side::Parent,
            Side::Parent => Side::Child,
        }
    }
}

/// The AND-of-equalities predicate of a composite foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinCondition {
    pairs: &'static [ColumnPair],
}

impl JoinCondition {
    pub const fn new(pairs: &'static [ColumnPair]) -> Self {
        Self { pairs }
    }

    pub const fn pairs(&self) -> &'static [ColumnPair] {
        self.pairs
    }

    /// Column names of one side, in pair order.
    pub fn columns(&self, side: Side) -> Vec<&'static str> {
        self.pairs
            .iter()
            .map(|p| match side {
                Side::Child => p.child,
                Side::Parent => p.parent,
            })
            .collect()
    }

    /// `child.c1 = parent.p1 AND child.c2 = parent.p2 ...`
    ///
    /// Used when the parent table is joined onto child rows.
    pub fn forward(&self, child_alias: &str, parent_alias: &str) -> Expr {
        Expr::all(self.pairs.iter().map(|p| {
            Expr::qualified(child_alias, p.child).eq(Expr::qualified(parent_alias, p.parent))
        }))
    }

    /// `parent.p1 = child.c1 AND parent.p2 = child.c2 ...`
    ///
    /// Used when child rows are joined onto a parent.
    pub fn reverse(&self, parent_alias: &str, child_alias: &str) -> Expr {
        Expr::all(self.pairs.iter().map(|p| {
            Expr::qualified(parent_alias, p.parent).eq(Expr::qualified(child_alias, p.child))
        }))
    }

    /// Read one side's key from a row. `None` if a column is absent or NULL.
    pub fn key_of(&self, side: Side, row: &Row) -> Option<CompositeKey> {
        CompositeKey::from_row(row, &self.columns(side))
    }

    /// Filter `side`'s table down to rows whose columns equal `key`.
    ///
    /// `key` holds one value per pair, typically read from the opposite side
    /// with [`JoinCondition::key_of`].
    pub fn bind(&self, side: Side, table: Option<&str>, key: &CompositeKey) -> Expr {
        Expr::all(
            self.columns(side)
                .into_iter()
                .zip(key.values())
                .map(|(column, value)| column_ref(table, column).eq(value.clone())),
        )
    }

    /// Filter `side`'s table down to rows matching any of `keys`.
    ///
    /// A single-column key renders as `col IN (...)`, a composite key as a
    /// row-value `(c1, c2) IN ((...), (...))`. No keys selects nothing.
    pub fn bind_many(&self, side: Side, table: Option<&str>, keys: &[CompositeKey]) -> Expr {
        let columns = self.columns(side);
        if columns.len() == 1 {
            let values: Vec<Value> = keys
                .iter()
                .filter_map(|k| k.values().first().cloned())
                .collect();
            return column_ref(table, columns[0]).in_list(values);
        }
        Expr::in_tuples(
            columns.into_iter().map(|c| column_ref(table, c)).collect(),
            keys.iter().map(|k| k.values().to_vec()).collect(),
        )
    }
}

fn column_ref(table: Option<&str>, column: &str) -> Expr {
    match table {
        Some(t) => Expr::qualified(t, column),
        None => Expr::col(column),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multicol_core::pair;

    const MEMBERSHIP_PERSON: &[ColumnPair] = &[
        pair("person_id", "id"),
        pair("membership_country_id", "person_country_id"),
    ];
    const SINGLE: &[ColumnPair] = &[pair("country_id", "id")];

    fn membership_row(person: i64, country: Option<i64>) -> Row {
        Row::new(
            vec![
                "id".to_string(),
                "person_id".to_string(),
                "membership_country_id".to_string(),
            ],
            vec![Value::BigInt(1), Value::BigInt(person), Value::from(country)],
        )
    }

    #[test]
    fn test_forward_and_reverse_predicates() {
        let cond = JoinCondition::new(MEMBERSHIP_PERSON);
        let mut params = Vec::new();
        assert_eq!(
            cond.forward("membership", "person").build(&mut params, 0),
            "\"membership\".\"person_id\" = \"person\".\"id\" AND \
             \"membership\".\"membership_country_id\" = \"person\".\"person_country_id\""
        );
        assert_eq!(
            cond.reverse("person", "membership").build(&mut params, 0),
            "\"person\".\"id\" = \"membership\".\"person_id\" AND \
             \"person\".\"person_country_id\" = \"membership\".\"membership_country_id\""
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_bind_parent_from_child_row() {
        let cond = JoinCondition::new(MEMBERSHIP_PERSON);
        let key = cond.key_of(Side::Child, &membership_row(4, Some(1))).unwrap();
        let filter = cond.bind(Side::Parent, Some("person"), &key);

        let mut params = Vec::new();
        let sql = filter.build_with_dialect(Dialect::Sqlite, &mut params, 0);
        assert_eq!(
            sql,
            "\"person\".\"id\" = ?1 AND \"person\".\"person_country_id\" = ?2"
        );
        assert_eq!(params, vec![Value::BigInt(4), Value::BigInt(1)]);

        let jane = Row::new(
            vec![
                "id".to_string(),
                "name".to_string(),
                "person_country_id".to_string(),
            ],
            vec![Value::BigInt(4), Value::from("Jane"), Value::BigInt(2)],
        );
        assert!(!filter.matches(&jane, "person").unwrap());
    }

    #[test]
    fn test_null_key_column_yields_no_key() {
        let cond = JoinCondition::new(MEMBERSHIP_PERSON);
        assert!(cond.key_of(Side::Child, &membership_row(4, None)).is_none());
    }

    #[test]
    fn test_bind_many_single_and_composite() {
        let keys = vec![
            CompositeKey::new(vec![Value::BigInt(1)]).unwrap(),
            CompositeKey::new(vec![Value::BigInt(2)]).unwrap(),
        ];
        let single = JoinCondition::new(SINGLE).bind_many(Side::Parent, None, &keys);
        let mut params = Vec::new();
        assert_eq!(single.build(&mut params, 0), "\"id\" IN ($1, $2)");

        let keys = vec![
            CompositeKey::new(vec![Value::BigInt(1), Value::BigInt(1)]).unwrap(),
            CompositeKey::new(vec![Value::BigInt(4), Value::BigInt(2)]).unwrap(),
        ];
        let composite =
            JoinCondition::new(MEMBERSHIP_PERSON).bind_many(Side::Child, None, &keys);
        params.clear();
        assert_eq!(
            composite.build(&mut params, 0),
            "(\"person_id\", \"membership_country_id\") IN (($1, $2), ($3, $4))"
        );

        let none = JoinCondition::new(MEMBERSHIP_PERSON).bind_many(Side::Child, None, &[]);
        assert_eq!(none, Expr::Literal(Value::Bool(false)));
    }

    #[test]
    fn test_join_sql() {
        let cond = JoinCondition::new(MEMBERSHIP_PERSON);
        let join = Join::left("person", cond.forward("membership", "p")).alias("p");
        assert_eq!(join.effective_alias(), "p");
        let mut params = Vec::new();
        let sql = join.build_with_dialect(Dialect::Postgres, &mut params, 0);
        assert!(sql.starts_with(" LEFT JOIN \"person\" AS \"p\" ON \"membership\".\"person_id\""));
        assert_eq!(Side::Child.opposite(), Side::Parent);
    }
}
