//! `SQLite` implementation of the database surface.

use crate::error::Result;
use crate::storage::db::{Database, Queryable, Transaction};
use rusqlite::{Connection, Row, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Default time a statement waits on a locked database file.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single `SQLite` connection shared behind a mutex.
///
/// Every statement holds the lock for its own duration; a transaction holds it
/// until it is committed or rolled back, so statements from other threads
/// wait for it to finish.
#[derive(Debug)]
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Open (or create) the database file at `path`.
    ///
    /// The connection runs in WAL mode with foreign keys on. No schema is
    /// applied here; see [`crate::storage::schema`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a pragma fails.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        debug!(path = %path.display(), "Opening database");
        let conn = Connection::open(path)?;
        configure(&conn, busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn, DEFAULT_BUSY_TIMEOUT)?;
        Ok(Self::from_connection(conn))
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run `f` with exclusive access to the underlying connection.
    ///
    /// Used by schema provisioning, which needs batch execution and its own
    /// transactions.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> R {
        let mut conn = self.lock();
        f(&mut conn)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Poisoning is recovered: SqliteTx rolls back on drop while unwinding.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn configure(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

impl Queryable for SqliteDb {
    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        Queryable::query_row(&*self.lock(), sql, params, f)
    }

    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        Queryable::execute(&*self.lock(), sql, params)
    }

    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        Queryable::query(&*self.lock(), sql, params, f)
    }
}

impl Database for SqliteDb {
    type Tx<'a> = SqliteTx<'a>;

    fn begin(&self) -> rusqlite::Result<SqliteTx<'_>> {
        let conn = self.lock();
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(SqliteTx {
            conn,
            finished: false,
        })
    }
}

/// A transaction holding the connection lock until it ends.
///
/// Dropping it without a successful [`Transaction::commit`] issues `ROLLBACK`.
pub struct SqliteTx<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl std::fmt::Debug for SqliteTx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTx")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Queryable for SqliteTx<'_> {
    fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        Queryable::query_row(&*self.conn, sql, params, f)
    }

    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        Queryable::execute(&*self.conn, sql, params)
    }

    fn query<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        Queryable::query(&*self.conn, sql, params, f)
    }
}

impl Transaction for SqliteTx<'_> {
    fn commit(mut self) -> rusqlite::Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self) -> rusqlite::Result<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if self.finished || self.conn.is_autocommit() {
            return;
        }
        if let Err(err) = self.conn.execute_batch("ROLLBACK") {
            warn!(error = %err, "Rollback of abandoned transaction failed");
        } else {
            debug!("Rolled back abandoned transaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_db() -> SqliteDb {
        let db = SqliteDb::open_memory().unwrap();
        db.with_connection(|conn| {
            conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL)")
                .unwrap();
        });
        db
    }

    fn count(db: &SqliteDb) -> i64 {
        db.query_row("SELECT count(*) FROM t", &[], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_open_memory() {
        let db = SqliteDb::open_memory().unwrap();
        assert!(db.ping().is_ok());
        let foreign_keys: i32 = db
            .query_row("PRAGMA foreign_keys", &[], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn test_commit_persists() {
        let db = scratch_db();
        let tx = db.begin().unwrap();
        tx.execute("INSERT INTO t (v) VALUES (?1)", &[&1]).unwrap();
        tx.commit().unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_drop_rolls_back() {
        let db = scratch_db();
        {
            let tx = db.begin().unwrap();
            tx.execute("INSERT INTO t (v) VALUES (?1)", &[&1]).unwrap();
        }
        assert_eq!(count(&db), 0);
        // The connection is usable again after the implicit rollback.
        db.execute("INSERT INTO t (v) VALUES (?1)", &[&2]).unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_explicit_rollback() {
        let db = scratch_db();
        let tx = db.begin().unwrap();
        tx.execute("INSERT INTO t (v) VALUES (?1)", &[&1]).unwrap();
        tx.rollback().unwrap();
        assert_eq!(count(&db), 0);
    }

    #[test]
    fn test_query_materializes_rows() {
        let db = scratch_db();
        for v in 1..=3 {
            db.execute("INSERT INTO t (v) VALUES (?1)", &[&v]).unwrap();
        }
        let mut values: Vec<i64> = db
            .query("SELECT v FROM t", &[], |row| row.get(0))
            .unwrap();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_open_file_uses_wal() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = SqliteDb::open(&dir.path().join("stored.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        let mode: String = db
            .query_row("PRAGMA journal_mode", &[], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_uppercase(), "WAL");
    }
}
