//! Field and column definitions.

use crate::types::SqlType;

/// Metadata about a model field/column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Database column name (may differ from field name)
    pub column_name: &'static str,
    /// SQL type for this field
    pub sql_type: SqlType,
    /// Whether this field is nullable
    pub nullable: bool,
    /// Whether this is a primary key
    pub primary_key: bool,
    /// Whether this field auto-increments
    pub auto_increment: bool,
    /// Foreign key reference (table.column)
    pub foreign_key: Option<&'static str>,
}

impl FieldInfo {
    /// Create a new field info with minimal required data.
    pub const fn new(name: &'static str, column_name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            column_name,
            sql_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            foreign_key: None,
        }
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set auto-increment flag.
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Set foreign key reference (`"table.column"`).
    pub const fn foreign_key(mut self, reference: &'static str) -> Self {
        self.foreign_key = Some(reference);
        self
    }

    /// Split the foreign key reference into `(table, column)`.
    pub fn foreign_key_target(&self) -> Option<(&'static str, &'static str)> {
        self.foreign_key.and_then(|r| r.split_once('.'))
    }
}

/// A column definition used when registering a table with the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl From<&FieldInfo> for Column {
    fn from(field: &FieldInfo) -> Self {
        Self {
            name: field.column_name.to_string(),
            sql_type: field.sql_type,
            nullable: field.nullable,
            primary_key: field.primary_key,
            auto_increment: field.auto_increment,
        }
    }
}
