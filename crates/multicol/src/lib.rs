//! multicol - composite foreign keys and junction-table relationships.
//!
//! A relationship between two tables may use several columns at once: a
//! membership row references a person by `(person_id, membership_country_id)`
//! and only reaches the person whose `(id, person_country_id)` matches both.
//! multicol provides:
//!
//! - Static relationship declarations on plain structs (`Model`)
//! - Resolution of a composite foreign key to its single parent row
//! - Reverse and many-to-many navigation, where a junction row only counts
//!   when it matches both ends on every paired column
//! - Batched prefetching in a fixed number of queries, and single-query
//!   eager joins
//! - Filtering through relationship paths (`person__name__contains`)
//!
//! # Quick Start
//!
//! ```ignore
//! use multicol::prelude::*;
//!
//! const MEMBERSHIP_PERSON: &[ColumnPair] = &[
//!     pair("person_id", "id"),
//!     pair("membership_country_id", "person_country_id"),
//! ];
//!
//! impl Model for Membership {
//!     const TABLE_NAME: &'static str = "membership";
//!     const PRIMARY_KEY: &'static [&'static str] = &["id"];
//!     const RELATIONSHIPS: &'static [RelationshipInfo] =
//!         &[RelationshipInfo::foreign_key("person", "person", MEMBERSHIP_PERSON)];
//!     // fields, to_row, from_row, ...
//! }
//!
//! let schema = Schema::new().with::<Person>()?.with::<Membership>()?;
//! let mut session = Session::new(MemoryConnection::new(), schema)?;
//! session.create_tables()?;
//!
//! let person: Person = session.resolve(&membership, "person")?;
//! let everyone: Vec<Option<Person>> =
//!     session.prefetch_one(&session.all::<Membership>()?, "person")?;
//! ```
//!
//! # Crates
//!
//! - `multicol-core`: values, rows, errors, model and relationship metadata
//! - `multicol-query`: expressions, composite join conditions, SELECT
//! - `multicol-store`: the `Connection` trait and the in-memory store
//! - `multicol-session`: schema registry, resolution, prefetching, filters

pub use multicol_core::{
    AutoIncrement, Column, ColumnPair, CompositeKey, Error, FieldInfo, FromValue, LinkTableInfo,
    Model, QueryErrorKind, RelationError, RelationErrorKind, RelationKind, RelationshipInfo,
    Result, Row, SchemaErrorKind, SqlType, Value, find_relationship, pair,
};
pub use multicol_query::{
    Dialect, Expr, Join, JoinCondition, JoinType, Lookup, LookupOp, LookupValue, OrderBy,
    OrderDirection, Select, Side,
};
pub use multicol_session::{
    FilterQuery, N1QueryTracker, N1Stats, Prefetched, RelationRef, Schema, Session,
    SessionConfig, TableMeta,
};
pub use multicol_store::{CapturedQuery, Connection, MemoryConnection, StoreConfig};

/// Everything needed to declare models and navigate their relationships.
pub mod prelude {
    pub use crate::{
        AutoIncrement, ColumnPair, Connection, Error, Expr, FieldInfo, LinkTableInfo,
        MemoryConnection, Model, RelationshipInfo, Result, Row, Schema, Session, SessionConfig,
        SqlType, StoreConfig, Value, pair,
    };
}
