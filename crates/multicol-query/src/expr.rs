//! SQL expressions for query building.
//!
//! An `Expr` is both rendered to SQL (for logging and for real drivers) and
//! evaluated directly against a `Row` by the in-memory storage layer.
//! Evaluation follows SQL three-valued logic: comparisons involving NULL
//! produce NULL, and only a predicate evaluating to TRUE selects a row.

use crate::clause::{OrderBy, OrderDirection};
use crate::pattern;
use multicol_core::{Error, QueryErrorKind, Result, Row, Value};
use serde::{Deserialize, Serialize};

/// Separator between a join alias and a column name in joined result rows.
pub const ALIAS_SEPARATOR: &str = "__";

/// Name under which a joined table's column appears in a result row.
pub fn aliased_column(alias: &str, column: &str) -> String {
    format!("{alias}{ALIAS_SEPARATOR}{column}")
}

/// SQL dialect for generating dialect-specific SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL dialect (uses $1, $2 placeholders)
    #[default]
    Postgres,
    /// SQLite dialect (uses ?1, ?2 placeholders)
    Sqlite,
    /// MySQL dialect (uses ? placeholders)
    Mysql,
}

impl Dialect {
    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Mysql => "?".to_string(),
        }
    }

    /// Check if this dialect supports ILIKE.
    pub const fn supports_ilike(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// Quote an identifier for this dialect.
    ///
    /// Embedded quote characters are doubled.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => {
                let escaped = name.replace('"', "\"\"");
                format!("\"{}\"", escaped)
            }
            Dialect::Mysql => {
                let escaped = name.replace('`', "``");
                format!("`{}`", escaped)
            }
        }
    }
}

/// A SQL expression that can be used in WHERE and ON clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference with optional table qualifier
    Column {
        /// Optional table name or alias
        table: Option<String>,
        /// Column name
        name: String,
    },

    /// Literal value
    Literal(Value),

    /// Binary operation (e.g., a = b, a AND b)
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// NOT expr
    Not(Box<Expr>),

    /// IN expression
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// Row-value IN: `(a, b) IN ((1, 2), (3, 4))`
    InTuple {
        exprs: Vec<Expr>,
        rows: Vec<Vec<Value>>,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// LIKE / NOT LIKE pattern
    Like {
        expr: Box<Expr>,
        pattern: String,
        negated: bool,
        case_insensitive: bool,
    },

    /// Parenthesized expression
    Paren(Box<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Logical AND
    And,
    /// Logical OR
    Or,
}

impl BinaryOp {
    /// Get the SQL representation of this operator.
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl Expr {
    // ==================== Constructors ====================

    /// Create a column reference expression.
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
        }
    }

    /// Create a qualified column reference (table.column).
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Column {
            table: Some(table.into()),
            name: column.into(),
        }
    }

    /// Create a literal value expression.
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a NULL literal.
    pub fn null() -> Self {
        Expr::Literal(Value::Null)
    }

    /// AND together a list of predicates. An empty list is TRUE.
    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Self {
        exprs
            .into_iter()
            .reduce(|acc, e| acc.and(e))
            .unwrap_or(Expr::Literal(Value::Bool(true)))
    }

    // ==================== Comparison Operators ====================

    fn binary(self, op: BinaryOp, other: impl Into<Expr>) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(other.into()),
        }
    }

    /// Equal to (=)
    pub fn eq(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// Not equal to (<>)
    pub fn ne(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ne, other)
    }

    /// Less than (<)
    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    /// Less than or equal to (<=)
    pub fn le(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Le, other)
    }

    /// Greater than (>)
    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    /// Greater than or equal to (>=)
    pub fn ge(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ge, other)
    }

    // ==================== Logical Operators ====================

    /// Logical AND
    pub fn and(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// Logical OR
    pub fn or(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// Logical NOT
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    // ==================== Null Checks ====================

    /// IS NULL
    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// IS NOT NULL
    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    // ==================== Pattern Matching ====================

    /// LIKE pattern match
    pub fn like(self, pattern: impl Into<String>) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: pattern.into(),
            negated: false,
            case_insensitive: false,
        }
    }

    /// ILIKE (case-insensitive) pattern match
    pub fn ilike(self, pattern: impl Into<String>) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: pattern.into(),
            negated: false,
            case_insensitive: true,
        }
    }

    /// Check if column contains the given substring (LIKE '%text%').
    ///
    /// Wildcards inside `text` match literally.
    pub fn contains(self, text: impl AsRef<str>) -> Self {
        self.like(format!("%{}%", pattern::escape_like(text.as_ref())))
    }

    /// Case-insensitive contains.
    pub fn icontains(self, text: impl AsRef<str>) -> Self {
        self.ilike(format!("%{}%", pattern::escape_like(text.as_ref())))
    }

    /// Check if column starts with the given prefix (LIKE 'text%').
    pub fn starts_with(self, text: impl AsRef<str>) -> Self {
        self.like(format!("{}%", pattern::escape_like(text.as_ref())))
    }

    /// Check if column ends with the given suffix (LIKE '%text').
    pub fn ends_with(self, text: impl AsRef<str>) -> Self {
        self.like(format!("%{}", pattern::escape_like(text.as_ref())))
    }

    /// Case-insensitive equality.
    pub fn iexact(self, text: impl AsRef<str>) -> Self {
        self.ilike(pattern::escape_like(text.as_ref()))
    }

    // ==================== IN Expressions ====================

    /// IN list of values. An empty list is FALSE.
    pub fn in_list(self, values: Vec<impl Into<Expr>>) -> Self {
        if values.is_empty() {
            return Expr::Literal(Value::Bool(false));
        }
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// Row-value IN over several columns. An empty row list is FALSE.
    pub fn in_tuples(exprs: Vec<Expr>, rows: Vec<Vec<Value>>) -> Self {
        if rows.is_empty() {
            return Expr::Literal(Value::Bool(false));
        }
        Expr::InTuple { exprs, rows }
    }

    // ==================== Ordering ====================

    /// Create an ascending ORDER BY expression.
    pub fn asc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    /// Create a descending ORDER BY expression.
    pub fn desc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: OrderDirection::Desc,
            nulls: None,
        }
    }

    /// Wrap expression in parentheses.
    pub fn paren(self) -> Self {
        Expr::Paren(Box::new(self))
    }

    // ==================== SQL Generation ====================

    /// Build SQL string and collect parameters (default PostgreSQL dialect).
    pub fn build(&self, params: &mut Vec<Value>, offset: usize) -> String {
        self.build_with_dialect(Dialect::Postgres, params, offset)
    }

    /// Build SQL string with specific dialect.
    pub fn build_with_dialect(
        &self,
        dialect: Dialect,
        params: &mut Vec<Value>,
        offset: usize,
    ) -> String {
        match self {
            Expr::Column { table, name } => {
                if let Some(t) = table {
                    format!(
                        "{}.{}",
                        dialect.quote_identifier(t),
                        dialect.quote_identifier(name)
                    )
                } else {
                    dialect.quote_identifier(name)
                }
            }

            Expr::Literal(value) => {
                params.push(value.clone());
                dialect.placeholder(offset + params.len())
            }

            Expr::Binary { left, op, right } => {
                let left_sql = left.build_with_dialect(dialect, params, offset);
                let right_sql = right.build_with_dialect(dialect, params, offset);
                format!("{left_sql} {} {right_sql}", op.as_str())
            }

            Expr::Not(expr) => {
                let expr_sql = expr.build_with_dialect(dialect, params, offset);
                format!("NOT {expr_sql}")
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                let expr_sql = expr.build_with_dialect(dialect, params, offset);
                let value_sqls: Vec<_> = values
                    .iter()
                    .map(|v| v.build_with_dialect(dialect, params, offset))
                    .collect();
                let not_str = if *negated { "NOT " } else { "" };
                format!("{expr_sql} {not_str}IN ({})", value_sqls.join(", "))
            }

            Expr::InTuple { exprs, rows } => {
                let expr_sqls: Vec<_> = exprs
                    .iter()
                    .map(|e| e.build_with_dialect(dialect, params, offset))
                    .collect();
                let row_sqls: Vec<_> = rows
                    .iter()
                    .map(|row| {
                        let parts: Vec<_> = row
                            .iter()
                            .map(|v| {
                                params.push(v.clone());
                                dialect.placeholder(offset + params.len())
                            })
                            .collect();
                        format!("({})", parts.join(", "))
                    })
                    .collect();
                format!("({}) IN ({})", expr_sqls.join(", "), row_sqls.join(", "))
            }

            Expr::IsNull { expr, negated } => {
                let expr_sql = expr.build_with_dialect(dialect, params, offset);
                let not_str = if *negated { " NOT" } else { "" };
                format!("{expr_sql} IS{not_str} NULL")
            }

            Expr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let expr_sql = expr.build_with_dialect(dialect, params, offset);
                params.push(Value::Text(pattern.clone()));
                let param = dialect.placeholder(offset + params.len());
                let not_str = if *negated { "NOT " } else { "" };
                let op = if *case_insensitive && dialect.supports_ilike() {
                    "ILIKE"
                } else if *case_insensitive {
                    // Fallback for dialects without ILIKE
                    return format!("LOWER({expr_sql}) {not_str}LIKE LOWER({param})");
                } else {
                    "LIKE"
                };
                format!("{expr_sql} {not_str}{op} {param}")
            }

            Expr::Paren(expr) => {
                let expr_sql = expr.build_with_dialect(dialect, params, offset);
                format!("({expr_sql})")
            }
        }
    }

    // ==================== Evaluation ====================

    /// Evaluate against a result row.
    ///
    /// `base` is the alias of the query's base table: columns qualified with
    /// it (or unqualified) are read by plain name, columns qualified with a
    /// join alias are read as `<alias>__<column>`.
    pub fn eval(&self, row: &Row, base: &str) -> Result<Value> {
        match self {
            Expr::Column { table, name } => lookup(row, base, table.as_deref(), name).cloned(),

            Expr::Literal(value) => Ok(value.clone()),

            Expr::Binary { left, op, right } => {
                let l = left.eval(row, base)?;
                match op {
                    BinaryOp::And => {
                        // FALSE AND anything is FALSE without looking right.
                        if truth(&l) == Some(false) {
                            return Ok(Value::Bool(false));
                        }
                        let r = right.eval(row, base)?;
                        Ok(tri_value(kleene_and(truth(&l), truth(&r))))
                    }
                    BinaryOp::Or => {
                        if truth(&l) == Some(true) {
                            return Ok(Value::Bool(true));
                        }
                        let r = right.eval(row, base)?;
                        Ok(tri_value(kleene_or(truth(&l), truth(&r))))
                    }
                    cmp_op => {
                        let r = right.eval(row, base)?;
                        compare(&l, *cmp_op, &r)
                    }
                }
            }

            Expr::Not(expr) => {
                let v = expr.eval(row, base)?;
                Ok(tri_value(truth(&v).map(|b| !b)))
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                let needle = expr.eval(row, base)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for candidate in values {
                    match needle.sql_eq(&candidate.eval(row, base)?) {
                        Some(true) => return Ok(Value::Bool(!*negated)),
                        Some(false) => {}
                        None => saw_null = true,
                    }
                }
                if saw_null {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Bool(*negated))
                }
            }

            Expr::InTuple { exprs, rows } => {
                let needle = exprs
                    .iter()
                    .map(|e| e.eval(row, base))
                    .collect::<Result<Vec<_>>>()?;
                let mut saw_null = false;
                for candidate in rows {
                    if candidate.len() != needle.len() {
                        return Err(Error::query(
                            QueryErrorKind::Evaluation,
                            format!(
                                "row value of {} columns compared with tuple of {}",
                                needle.len(),
                                candidate.len()
                            ),
                        ));
                    }
                    let matched = needle
                        .iter()
                        .zip(candidate)
                        .map(|(a, b)| a.sql_eq(b))
                        .fold(Some(true), kleene_and);
                    match matched {
                        Some(true) => return Ok(Value::Bool(true)),
                        Some(false) => {}
                        None => saw_null = true,
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Bool(false)
                })
            }

            Expr::IsNull { expr, negated } => {
                let v = expr.eval(row, base)?;
                Ok(Value::Bool(v.is_null() != *negated))
            }

            Expr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let v = expr.eval(row, base)?;
                let text = match &v {
                    Value::Null => return Ok(Value::Null),
                    Value::Text(s) => s,
                    other => {
                        return Err(Error::query(
                            QueryErrorKind::Evaluation,
                            format!("LIKE applied to {} value", other.type_name()),
                        ));
                    }
                };
                let matched = pattern::like_matches(text, pattern, *case_insensitive)
                    .map_err(|e| Error::query(QueryErrorKind::Evaluation, e.to_string()))?;
                Ok(Value::Bool(matched != *negated))
            }

            Expr::Paren(expr) => expr.eval(row, base),
        }
    }

    /// Does this predicate select `row`? NULL does not.
    pub fn matches(&self, row: &Row, base: &str) -> Result<bool> {
        Ok(truth(&self.eval(row, base)?) == Some(true))
    }
}

fn lookup<'r>(row: &'r Row, base: &str, table: Option<&str>, name: &str) -> Result<&'r Value> {
    let found = match table {
        Some(t) if t != base => row.get_by_name(&aliased_column(t, name)),
        _ => row.get_by_name(name),
    };
    found.ok_or_else(|| {
        let shown = match table {
            Some(t) => format!("{t}.{name}"),
            None => name.to_string(),
        };
        Error::query(
            QueryErrorKind::UnknownColumn,
            format!("column '{shown}' is not part of the result row"),
        )
    })
}

fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        other => other.as_bool(),
    }
}

fn tri_value(value: Option<bool>) -> Value {
    value.map_or(Value::Null, Value::Bool)
}

fn kleene_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn kleene_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn compare(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    use std::cmp::Ordering;

    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    match op {
        BinaryOp::Eq => return Ok(tri_value(left.sql_eq(right))),
        BinaryOp::Ne => return Ok(tri_value(left.sql_eq(right).map(|b| !b))),
        _ => {}
    }
    let ord = left.sql_cmp(right).ok_or_else(|| {
        Error::query(
            QueryErrorKind::Evaluation,
            format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ),
        )
    })?;
    let result = match op {
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        other => {
            return Err(Error::query(
                QueryErrorKind::Evaluation,
                format!("{} is not a comparison", other.as_str()),
            ));
        }
    };
    Ok(Value::Bool(result))
}

// Conversion from Value to Expr
impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(Value::Text(s.to_string()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Value::Text(s))
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::Literal(Value::Int(n))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Literal(Value::BigInt(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Literal(Value::Double(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_row() -> Row {
        Row::new(
            vec![
                "id".to_string(),
                "name".to_string(),
                "person_country_id".to_string(),
                "m__date_joined".to_string(),
                "m__invite_reason".to_string(),
            ],
            vec![
                Value::BigInt(1),
                Value::Text("Bob".to_string()),
                Value::BigInt(1),
                Value::Timestamp(100),
                Value::Null,
            ],
        )
    }

    // ==================== SQL Rendering ====================

    #[test]
    fn test_column_simple() {
        let mut params = Vec::new();
        assert_eq!(Expr::col("name").build(&mut params, 0), "\"name\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_column_qualified_per_dialect() {
        let expr = Expr::qualified("person", "id");
        let mut params = Vec::new();
        assert_eq!(expr.build(&mut params, 0), "\"person\".\"id\"");
        assert_eq!(
            expr.build_with_dialect(Dialect::Mysql, &mut params, 0),
            "`person`.`id`"
        );
    }

    #[test]
    fn test_and_of_equalities() {
        let expr = Expr::col("person_id")
            .eq(1_i64)
            .and(Expr::col("membership_country_id").eq(2_i64));
        let mut params = Vec::new();
        let sql = expr.build(&mut params, 0);
        assert_eq!(sql, "\"person_id\" = $1 AND \"membership_country_id\" = $2");
        assert_eq!(params, vec![Value::BigInt(1), Value::BigInt(2)]);
    }

    #[test]
    fn test_tuple_in_rendering() {
        let expr = Expr::in_tuples(
            vec![Expr::col("id"), Expr::col("person_country_id")],
            vec![
                vec![Value::BigInt(1), Value::BigInt(1)],
                vec![Value::BigInt(4), Value::BigInt(2)],
            ],
        );
        let mut params = Vec::new();
        let sql = expr.build_with_dialect(Dialect::Sqlite, &mut params, 0);
        assert_eq!(
            sql,
            "(\"id\", \"person_country_id\") IN ((?1, ?2), (?3, ?4))"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_ilike_fallback_sqlite() {
        let expr = Expr::col("name").icontains("o");
        let mut params = Vec::new();
        let sql = expr.build_with_dialect(Dialect::Sqlite, &mut params, 0);
        assert_eq!(sql, "LOWER(\"name\") LIKE LOWER(?1)");
        assert_eq!(params[0], Value::Text("%o%".to_string()));
    }

    #[test]
    fn test_empty_in_list_is_false() {
        let expr = Expr::col("id").in_list(Vec::<Value>::new());
        assert_eq!(expr, Expr::Literal(Value::Bool(false)));
        assert!(!expr.matches(&person_row(), "person").unwrap());
    }

    #[test]
    fn test_offset_placeholders() {
        let mut params = vec![Value::BigInt(9)];
        let sql = Expr::col("id").eq(1_i64).build(&mut params, 0);
        assert_eq!(sql, "\"id\" = $2");
    }

    // ==================== Evaluation ====================

    #[test]
    fn test_eval_composite_equality() {
        let row = person_row();
        let hit = Expr::qualified("person", "id")
            .eq(1_i64)
            .and(Expr::qualified("person", "person_country_id").eq(1_i64));
        let miss = Expr::col("id")
            .eq(1_i64)
            .and(Expr::col("person_country_id").eq(2_i64));
        assert!(hit.matches(&row, "person").unwrap());
        assert!(!miss.matches(&row, "person").unwrap());
    }

    #[test]
    fn test_eval_joined_alias_columns() {
        let row = person_row();
        let expr = Expr::qualified("m", "date_joined").ge(Value::Timestamp(50));
        assert!(expr.matches(&row, "person").unwrap());
        let err = Expr::qualified("x", "date_joined")
            .eval(&row, "person")
            .unwrap_err();
        assert!(matches!(err, Error::Query(ref q) if q.kind == QueryErrorKind::UnknownColumn));
    }

    #[test]
    fn test_eval_null_is_unknown() {
        let row = person_row();
        let eq_null = Expr::qualified("m", "invite_reason").eq("x");
        assert_eq!(eq_null.eval(&row, "person").unwrap(), Value::Null);
        assert!(!eq_null.matches(&row, "person").unwrap());
        assert!(!eq_null.clone().not().matches(&row, "person").unwrap());
        assert!(
            Expr::qualified("m", "invite_reason")
                .is_null()
                .matches(&row, "person")
                .unwrap()
        );
    }

    #[test]
    fn test_eval_kleene_logic() {
        let row = person_row();
        let unknown = Expr::qualified("m", "invite_reason").eq("x");
        let t = Expr::col("id").eq(1_i64);
        let f = Expr::col("id").eq(2_i64);
        assert!(!unknown.clone().and(t.clone()).matches(&row, "p").unwrap());
        assert!(unknown.clone().or(t).matches(&row, "p").unwrap());
        assert_eq!(
            unknown.and(f).eval(&row, "p").unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_eval_in_tuple() {
        let row = person_row();
        let hit = Expr::in_tuples(
            vec![Expr::col("id"), Expr::col("person_country_id")],
            vec![
                vec![Value::BigInt(2), Value::BigInt(1)],
                vec![Value::Int(1), Value::Int(1)],
            ],
        );
        let miss = Expr::in_tuples(
            vec![Expr::col("id"), Expr::col("person_country_id")],
            vec![vec![Value::BigInt(1), Value::BigInt(2)]],
        );
        assert!(hit.matches(&row, "person").unwrap());
        assert!(!miss.matches(&row, "person").unwrap());
    }

    #[test]
    fn test_eval_like_and_in() {
        let row = person_row();
        assert!(Expr::col("name").contains("o").matches(&row, "p").unwrap());
        assert!(!Expr::col("name").contains("x").matches(&row, "p").unwrap());
        assert!(Expr::col("name").iexact("BOB").matches(&row, "p").unwrap());
        assert!(
            Expr::col("id")
                .in_list(vec![3_i64, 1_i64])
                .matches(&row, "p")
                .unwrap()
        );
        assert!(Expr::col("id").contains("1").eval(&row, "p").is_err());
    }

    #[test]
    fn test_eval_incomparable_ordering_errors() {
        let row = person_row();
        assert!(Expr::col("name").gt(1_i64).eval(&row, "p").is_err());
        assert_eq!(
            Expr::col("name").eq(1_i64).eval(&row, "p").unwrap(),
            Value::Bool(false)
        );
    }
}
