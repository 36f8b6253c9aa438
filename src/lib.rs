//! `stored` - typed JSON documents over SQLite.
//!
//! Each collection is a table of JSON documents wrapped in an audit envelope
//! (who created or last modified a document, and when). A [`storage::Store`]
//! binds one Rust content type to one collection and supports add, partial
//! patch, get and conditional list.
//!
//! # Architecture
//!
//! - [`model`] - `Stored<T>` envelope, `Condition`, `Operator`, `Attributes`
//! - [`storage`] - database surface, `SQLite` implementation, SQL generation,
//!   the generic store, schema migrations
//! - [`domain`] - content types provisioned by the migrations
//! - [`health`] - connectivity report
//! - [`config`] - layered configuration
//! - [`cli`] - command-line interface using clap
//! - [`format`] - text and JSON output
//! - [`error`] - error types and codes

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod health;
pub mod logging;
pub mod model;
pub mod storage;

pub use error::{ErrorCode, ErrorResponse, Result, StoreError};
pub use model::{Attributes, Condition, Operator, Stored};
pub use storage::{SqlStore, SqliteDb, Store};
