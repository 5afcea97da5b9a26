//! Query construction for multicol.
//!
//! `multicol-query` turns relationship metadata into predicates and SELECT
//! descriptions.
//!
//! # Role In The Architecture
//!
//! - **Expression DSL**: `Expr` builds WHERE and ON clauses, renders them as
//!   SQL for Postgres, SQLite or MySQL, and evaluates them against rows.
//! - **Composite joins**: `JoinCondition` expands the column pairs of a
//!   composite foreign key into an AND of equalities, in either direction,
//!   or binds one side to concrete key values (single or batched).
//! - **Lookups**: `Lookup` parses `relation__column__op` filter paths.
//!
//! The resulting `Select` values execute through the `Connection` trait in
//! `multicol-store`.

pub mod clause;
pub mod expr;
pub mod join;
pub mod lookup;
pub mod pattern;
pub mod select;

pub use clause::{NullsOrder, OrderBy, OrderDirection, sort_rows};
pub use expr::{ALIAS_SEPARATOR, BinaryOp, Dialect, Expr, aliased_column};
pub use join::{Join, JoinCondition, JoinType, Side};
pub use lookup::{Lookup, LookupOp, LookupValue};
pub use select::Select;
