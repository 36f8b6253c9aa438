#![allow(dead_code)]

use std::sync::{Arc, Once};
use stored::storage::{SqlStore, SqliteDb, schema};
use stored::{Attributes, Stored};
use tempfile::TempDir;

pub mod cli;
pub mod fixtures;

use fixtures::Content;

static INIT: Once = Once::new();

/// Collection used by the generic store tests.
pub const TEST_COLLECTION: &str = "stored";

pub fn init_test_logging() {
    INIT.call_once(|| {
        stored::logging::init_test_logging();
    });
}

/// In-memory database at the latest schema, plus the test collection.
pub fn test_db() -> Arc<SqliteDb> {
    init_test_logging();
    let db = SqliteDb::open_memory().expect("Failed to create test database");
    provision(&db);
    Arc::new(db)
}

pub fn test_db_with_dir() -> (Arc<SqliteDb>, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = SqliteDb::open(&dir.path().join("stored.db"), std::time::Duration::from_secs(5))
        .expect("Failed to create test database");
    provision(&db);
    (Arc::new(db), dir)
}

fn provision(db: &SqliteDb) {
    db.with_connection(|conn| {
        schema::upgrade(conn).expect("migrate");
        conn.execute_batch(&schema::collection_ddl(TEST_COLLECTION).expect("ddl"))
            .expect("create test collection");
    });
}

pub fn content_store(db: &Arc<SqliteDb>) -> SqlStore<Content, SqliteDb> {
    SqlStore::new(Arc::clone(db), TEST_COLLECTION).expect("store")
}

pub fn sorted_ids<T>(docs: &[Stored<T>]) -> Vec<String> {
    let mut ids: Vec<String> = docs.iter().map(|doc| doc.id.clone()).collect();
    ids.sort();
    ids
}

pub fn attrs(pairs: &[(&str, serde_json::Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}
