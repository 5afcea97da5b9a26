//! Error types for multicol operations.

use crate::value::Value;
use std::fmt;

/// The primary error type for all multicol operations.
#[derive(Debug)]
pub enum Error {
    /// Relationship resolution errors (no match, ambiguous match)
    Relation(RelationError),
    /// Query construction or execution errors
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Schema/declaration errors
    Schema(SchemaError),
    /// Configuration errors
    Config(ConfigError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

/// A composite-key lookup that did not produce exactly one row.
#[derive(Debug, Clone)]
pub struct RelationError {
    pub kind: RelationErrorKind,
    /// Table that was searched
    pub table: String,
    /// Relationship being resolved
    pub relationship: String,
    /// The composite key values that were looked up
    pub key: Vec<Value>,
    /// Number of rows that matched
    pub matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationErrorKind {
    /// No row satisfied every column of the composite key
    NotFound,
    /// More than one row satisfied the composite key
    AmbiguousMatch,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Column referenced by a predicate or ordering does not exist
    UnknownColumn,
    /// A filter path could not be parsed or walked
    InvalidLookup,
    /// A predicate could not be evaluated (e.g. LIKE on a number)
    Evaluation,
    /// Other storage error
    Storage,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
    pub rust_type: Option<&'static str>,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// Table already registered
    TableExists,
    /// Table not found
    TableNotFound,
    /// Column not found
    ColumnNotFound,
    /// Relationship not found on the model
    RelationshipNotFound,
    /// Relationship exists but has the wrong kind for the operation
    WrongRelationKind,
    /// Invalid relationship or table declaration
    Invalid,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl Error {
    /// Is this a "no matching row" relation error?
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Relation(r) if r.kind == RelationErrorKind::NotFound)
    }

    /// Is this an "ambiguous composite match" relation error?
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Error::Relation(r) if r.kind == RelationErrorKind::AmbiguousMatch)
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }

    /// Build a schema error.
    pub fn schema(kind: SchemaErrorKind, message: impl Into<String>) -> Self {
        Error::Schema(SchemaError {
            kind,
            message: message.into(),
        })
    }

    /// Shorthand for a table-not-found schema error.
    pub fn table_not_found(table: &str) -> Self {
        Self::schema(
            SchemaErrorKind::TableNotFound,
            format!("table '{}' is not registered", table),
        )
    }

    /// Shorthand for a column-not-found schema error.
    pub fn column_not_found(table: &str, column: &str) -> Self {
        Self::schema(
            SchemaErrorKind::ColumnNotFound,
            format!("table '{}' has no column '{}'", table, column),
        )
    }

    /// Shorthand for a relationship-not-found schema error.
    pub fn relationship_not_found(table: &str, name: &str) -> Self {
        Self::schema(
            SchemaErrorKind::RelationshipNotFound,
            format!("table '{}' has no relationship '{}'", table, name),
        )
    }

    /// Shorthand for a query error without SQL attached.
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: None,
            message: message.into(),
        })
    }
}

impl RelationError {
    /// Build a `NotFound` error for a composite lookup.
    pub fn not_found(
        table: impl Into<String>,
        relationship: impl Into<String>,
        key: Vec<Value>,
    ) -> Self {
        Self {
            kind: RelationErrorKind::NotFound,
            table: table.into(),
            relationship: relationship.into(),
            key,
            matches: 0,
        }
    }

    /// Build an `AmbiguousMatch` error for a composite lookup.
    pub fn ambiguous(
        table: impl Into<String>,
        relationship: impl Into<String>,
        key: Vec<Value>,
        matches: usize,
    ) -> Self {
        Self {
            kind: RelationErrorKind::AmbiguousMatch,
            table: table.into(),
            relationship: relationship.into(),
            key,
            matches,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Relation(e) => write!(f, "Relation error: {}", e),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Schema(e) => write!(f, "Schema error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for RelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RelationErrorKind::NotFound => write!(
                f,
                "no '{}' row matches '{}' for key {:?}",
                self.table, self.relationship, self.key
            ),
            RelationErrorKind::AmbiguousMatch => write!(
                f,
                "{} '{}' rows match '{}' for key {:?}; the paired columns must include a unique key",
                self.matches, self.table, self.relationship, self.key
            ),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sql) = &self.sql {
            write!(f, "{} (in: {})", self.message, sql)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<RelationError> for Error {
    fn from(err: RelationError) -> Self {
        Error::Relation(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for multicol operations.
pub type Result<T> = std::result::Result<T, Error>;
