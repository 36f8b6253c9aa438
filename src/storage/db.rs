//! The narrow database surface the document store consumes.
//!
//! The store never opens connections or picks an engine; it is handed
//! something implementing [`Database`] and only ever runs single statements or
//! a scoped [`Transaction`] through it.

use rusqlite::{Connection, Row, ToSql};

/// Statement execution shared by databases and transactions.
pub trait Queryable {
    /// Run a statement expected to yield one row and map it with `f`.
    ///
    /// # Errors
    ///
    /// Returns `QueryReturnedNoRows` when nothing matched, or any engine error.
    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>;

    /// Run a statement that yields no rows, returning the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns any engine error.
    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize>;

    /// Run a statement and map every resulting row, fully materialized.
    ///
    /// # Errors
    ///
    /// Returns the first engine or mapping error; no partial result is returned.
    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>;
}

/// A shareable database handle able to start transactions.
pub trait Database: Queryable + Send + Sync {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    /// Begin a transaction scoped to the returned value.
    ///
    /// Dropping the value without calling [`Transaction::commit`] rolls back.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the transaction cannot be started.
    fn begin(&self) -> rusqlite::Result<Self::Tx<'_>>;

    /// Check that the database answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the round trip fails.
    fn ping(&self) -> rusqlite::Result<()> {
        self.query_row("SELECT 1", &[], |row| row.get::<_, i64>(0))
            .map(|_| ())
    }
}

/// An open transaction. Rolled back on drop unless committed.
pub trait Transaction: Queryable {
    /// # Errors
    ///
    /// Returns an engine error if the commit fails; the transaction is then
    /// rolled back.
    fn commit(self) -> rusqlite::Result<()>;

    /// # Errors
    ///
    /// Returns an engine error if the rollback fails.
    fn rollback(self) -> rusqlite::Result<()>;
}

impl Queryable for Connection {
    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.prepare_cached(sql)?;
        stmt.query_row(params, f)
    }

    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        let mut stmt = self.prepare_cached(sql)?;
        stmt.execute(params)
    }

    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.prepare_cached(sql)?;
        let rows = stmt.query_map(params, f)?;
        rows.collect()
    }
}
