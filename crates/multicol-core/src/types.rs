//! SQL type definitions and mapping.

use crate::value::Value;

/// SQL data types understood by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    BigInt,
    Double,
    Boolean,
    Text,
    Timestamp,
    Json,
}

impl SqlType {
    /// Get the SQL type name for this type.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Json => "JSON",
        }
    }

    /// Check whether a non-NULL value can be stored in a column of this type.
    ///
    /// Integer widths are interchangeable; NULL is checked separately
    /// against the column's nullability.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (SqlType::Integer | SqlType::BigInt, Value::Int(_) | Value::BigInt(_)) => true,
            (SqlType::Double, Value::Double(_) | Value::Int(_) | Value::BigInt(_)) => true,
            (SqlType::Boolean, Value::Bool(_)) => true,
            (SqlType::Text, Value::Text(_)) => true,
            (SqlType::Timestamp, Value::Timestamp(_)) => true,
            (SqlType::Json, Value::Json(_)) => true,
            _ => false,
        }
    }
}
