//! `SQLite` storage layer for `stored`.
//!
//! # Submodules
//!
//! - [`db`] - The database surface the store consumes (`Queryable`, `Database`, `Transaction`)
//! - [`sqlite`] - `SQLite` implementation of that surface
//! - [`statement`] - SQL text generation and identifier validation
//! - [`store`] - The generic document store
//! - [`schema`] - Collection DDL and versioned migrations

pub mod db;
pub mod schema;
pub mod sqlite;
pub mod statement;
pub mod store;

pub use db::{Database, Queryable, Transaction};
pub use sqlite::{SqliteDb, SqliteTx};
pub use store::{SqlStore, Store};
