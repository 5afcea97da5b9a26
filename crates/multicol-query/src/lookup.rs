//! Field lookup paths such as `person__name__contains`.
//!
//! A path is a `__`-separated list of relationship names, a column name and
//! an optional lookup operator. Only the operator is recognized here; which
//! segments are relationships is decided by the caller against its schema.

use crate::expr::{ALIAS_SEPARATOR, Expr};
use crate::pattern;
use multicol_core::{Error, QueryErrorKind, Result, Value};

/// Comparison applied at the end of a lookup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOp {
    Exact,
    IExact,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsNull,
}

impl LookupOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "exact" => LookupOp::Exact,
            "iexact" => LookupOp::IExact,
            "contains" => LookupOp::Contains,
            "icontains" => LookupOp::IContains,
            "startswith" => LookupOp::StartsWith,
            "endswith" => LookupOp::EndsWith,
            "gt" => LookupOp::Gt,
            "gte" => LookupOp::Gte,
            "lt" => LookupOp::Lt,
            "lte" => LookupOp::Lte,
            "in" => LookupOp::In,
            "isnull" => LookupOp::IsNull,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LookupOp::Exact => "exact",
            LookupOp::IExact => "iexact",
            LookupOp::Contains => "contains",
            LookupOp::IContains => "icontains",
            LookupOp::StartsWith => "startswith",
            LookupOp::EndsWith => "endswith",
            LookupOp::Gt => "gt",
            LookupOp::Gte => "gte",
            LookupOp::Lt => "lt",
            LookupOp::Lte => "lte",
            LookupOp::In => "in",
            LookupOp::IsNull => "isnull",
        }
    }

    /// Build the predicate for `column <op> value`.
    pub fn build(self, column: Expr, value: LookupValue) -> Result<Expr> {
        match (self, value) {
            (LookupOp::In, LookupValue::List(values)) => Ok(column.in_list(values)),
            (LookupOp::In, LookupValue::Single(_)) => Err(invalid("'in' expects a list of values")),
            (op, LookupValue::List(_)) => Err(invalid(format!(
                "'{}' expects a single value, not a list",
                op.as_str()
            ))),
            (LookupOp::IsNull, LookupValue::Single(v)) => match v.as_bool() {
                Some(true) => Ok(column.is_null()),
                Some(false) => Ok(column.is_not_null()),
                None => Err(invalid("'isnull' expects a boolean")),
            },
            // Comparing with NULL is never true; use isnull instead.
            (LookupOp::Exact, LookupValue::Single(Value::Null)) => Ok(column.is_null()),
            (LookupOp::Exact, LookupValue::Single(v)) => Ok(column.eq(v)),
            (LookupOp::Gt, LookupValue::Single(v)) => Ok(column.gt(v)),
            (LookupOp::Gte, LookupValue::Single(v)) => Ok(column.ge(v)),
            (LookupOp::Lt, LookupValue::Single(v)) => Ok(column.lt(v)),
            (LookupOp::Lte, LookupValue::Single(v)) => Ok(column.le(v)),
            (op, LookupValue::Single(v)) => {
                let text = v
                    .as_str()
                    .ok_or_else(|| invalid(format!("'{}' expects a text value", op.as_str())))?;
                let escaped = pattern::escape_like(text);
                Ok(match op {
                    LookupOp::IExact => column.ilike(escaped),
                    LookupOp::Contains => column.like(format!("%{escaped}%")),
                    LookupOp::IContains => column.ilike(format!("%{escaped}%")),
                    LookupOp::StartsWith => column.like(format!("{escaped}%")),
                    _ => column.like(format!("%{escaped}")),
                })
            }
        }
    }
}

/// The right-hand side of a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupValue {
    Single(Value),
    List(Vec<Value>),
}

/// A parsed lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Relationship names to traverse, outermost first.
    pub relations: Vec<String>,
    /// Column on the final model.
    pub column: String,
    pub op: LookupOp,
}

impl Lookup {
    /// Parse `rel__rel__column__op`. The operator defaults to `exact`.
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments: Vec<&str> = path.split(ALIAS_SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid(format!("malformed lookup path '{path}'")));
        }
        let op = match segments.last().and_then(|s| LookupOp::from_name(s)) {
            Some(op) if segments.len() > 1 => {
                segments.pop();
                op
            }
            _ => LookupOp::Exact,
        };
        let Some(column) = segments.pop() else {
            return Err(invalid(format!("malformed lookup path '{path}'")));
        };
        Ok(Self {
            relations: segments.into_iter().map(str::to_string).collect(),
            column: column.to_string(),
            op,
        })
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::query(QueryErrorKind::InvalidLookup, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_path() {
        let lookup = Lookup::parse("person__name__contains").unwrap();
        assert_eq!(lookup.relations, vec!["person".to_string()]);
        assert_eq!(lookup.column, "name");
        assert_eq!(lookup.op, LookupOp::Contains);
    }

    #[test]
    fn test_parse_defaults_to_exact() {
        let lookup = Lookup::parse("membership__group__name").unwrap();
        assert_eq!(lookup.relations, vec!["membership", "group"]);
        assert_eq!(lookup.column, "name");
        assert_eq!(lookup.op, LookupOp::Exact);

        let bare = Lookup::parse("name").unwrap();
        assert!(bare.relations.is_empty());
        assert_eq!(bare.op, LookupOp::Exact);
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(Lookup::parse("").is_err());
        assert!(Lookup::parse("person____name").is_err());
        assert!(Lookup::parse("person__").is_err());
    }

    #[test]
    fn test_build_predicates() {
        let col = Expr::col("name");
        assert_eq!(
            LookupOp::Contains
                .build(col.clone(), LookupValue::Single(Value::from("o")))
                .unwrap(),
            col.clone().like("%o%")
        );
        assert_eq!(
            LookupOp::Exact
                .build(col.clone(), LookupValue::Single(Value::Null))
                .unwrap(),
            col.clone().is_null()
        );
        assert_eq!(
            LookupOp::IsNull
                .build(col.clone(), LookupValue::Single(Value::Bool(false)))
                .unwrap(),
            col.clone().is_not_null()
        );
        assert!(
            LookupOp::In
                .build(col.clone(), LookupValue::Single(Value::from(1_i64)))
                .is_err()
        );
        assert!(
            LookupOp::Gt
                .build(col.clone(), LookupValue::List(vec![]))
                .is_err()
        );
        assert!(
            LookupOp::StartsWith
                .build(col, LookupValue::Single(Value::BigInt(1)))
                .is_err()
        );
    }
}
