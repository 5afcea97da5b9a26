//! Hashable composite keys.
//!
//! Batch loading groups rows by the values of several columns at once. A
//! `CompositeKey` normalizes those values so that keys which compare equal
//! under SQL semantics (`Int(1)` and `BigInt(1)`) also hash equal.

use std::hash::{Hash, Hasher};

use crate::row::Row;
use crate::value::Value;

/// Normalized, hashable part of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Bool(bool),
    Int(i64),
    Double(u64),
    Text(String),
    Timestamp(i64),
    Json(String),
}

impl KeyPart {
    fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => return None,
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Int(i) => KeyPart::Int(i64::from(*i)),
            Value::BigInt(i) => KeyPart::Int(*i),
            #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
            Value::Double(f) => {
                let truncated = *f as i64;
                if truncated as f64 == *f {
                    KeyPart::Int(truncated)
                } else {
                    KeyPart::Double(f.to_bits())
                }
            }
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Timestamp(t) => KeyPart::Timestamp(*t),
            Value::Json(j) => KeyPart::Json(j.to_string()),
        })
    }
}

/// The values of an ordered list of key columns, usable as a map key.
///
/// A key never contains NULL: SQL equality with NULL is unknown, so a row
/// whose key has a NULL part cannot be related to anything.
#[derive(Debug, Clone)]
pub struct CompositeKey {
    parts: Vec<KeyPart>,
    values: Vec<Value>,
}

impl CompositeKey {
    /// Build a key from values. Returns `None` if any value is NULL.
    pub fn new(values: Vec<Value>) -> Option<Self> {
        let parts = values
            .iter()
            .map(KeyPart::from_value)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { parts, values })
    }

    /// Read `columns` from `row` in order.
    ///
    /// Returns `None` if a column is missing or holds NULL.
    pub fn from_row(row: &Row, columns: &[&str]) -> Option<Self> {
        let values = columns
            .iter()
            .map(|c| row.get_by_name(c).cloned())
            .collect::<Option<Vec<_>>>()?;
        Self::new(values)
    }

    /// The key values, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl PartialEq for CompositeKey {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for CompositeKey {}

impl Hash for CompositeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}
