//! Relational storage for multicol.
//!
//! The session layer talks to storage only through the [`Connection`]
//! trait: create a table, insert a row, run a [`Select`]. The bundled
//! [`MemoryConnection`] executes selects in memory and counts every query,
//! which is how batching guarantees are checked.
//!
//! [`Select`]: multicol_query::Select

pub mod config;
pub mod connection;
pub mod memory;

pub use config::StoreConfig;
pub use connection::Connection;
pub use memory::{CapturedQuery, MemoryConnection};
