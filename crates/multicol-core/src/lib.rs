//! Core types and traits for multicol.
//!
//! This crate provides the foundational abstractions shared by every other
//! multicol crate:
//!
//! - `Value` and `Row` for dynamically-typed row data
//! - `Model` trait for struct-to-table mapping
//! - `FieldInfo` and `RelationshipInfo` for static schema metadata
//! - `CompositeKey` for grouping rows by several columns at once
//! - `Error` and `Result` for every fallible operation

pub mod error;
pub mod field;
pub mod key;
pub mod model;
pub mod relationship;
pub mod row;
pub mod types;
pub mod value;

pub use error::{
    ConfigError, Error, QueryError, QueryErrorKind, RelationError, RelationErrorKind, Result,
    SchemaError, SchemaErrorKind, TypeError,
};
pub use field::{Column, FieldInfo};
pub use key::CompositeKey;
pub use model::{AutoIncrement, Model};
pub use relationship::{
    ColumnPair, LinkTableInfo, RelationKind, RelationshipInfo, child_columns, find_relationship,
    pair, parent_columns,
};
pub use row::{ColumnInfo, FromValue, Row};
pub use types::SqlType;
pub use value::Value;
