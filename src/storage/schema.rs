//! Collection DDL and versioned schema migrations.
//!
//! The document store assumes its collections exist; this module is the
//! collaborator that provisions them. Applied versions are tracked in
//! `PRAGMA user_version`, and every migration can be undone.

use crate::error::{Result, StoreError};
use crate::storage::db::Queryable;
use crate::storage::statement::validate_identifier;
use rusqlite::Connection;
use tracing::{debug, info};

/// One reversible schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// Registered migrations, strictly increasing by version.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "item collection",
        up: r"
            CREATE TABLE item (
                id TEXT NOT NULL PRIMARY KEY CHECK (length(id) BETWEEN 1 AND 36),
                content TEXT NOT NULL CHECK (json_valid(content)),
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                modified_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                created_by TEXT NOT NULL CHECK (length(created_by) BETWEEN 1 AND 50),
                modified_by TEXT NOT NULL CHECK (length(modified_by) BETWEEN 1 AND 50)
            );
            CREATE INDEX item_name_idx ON item (json_extract(content, '$.name'));
        ",
        down: r"
            DROP INDEX IF EXISTS item_name_idx;
            DROP TABLE IF EXISTS item;
        ",
    },
    Migration {
        version: 2,
        description: "app collection",
        up: r"
            CREATE TABLE app (
                id TEXT NOT NULL PRIMARY KEY CHECK (length(id) BETWEEN 1 AND 36),
                content TEXT NOT NULL CHECK (json_valid(content)),
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                modified_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                created_by TEXT NOT NULL CHECK (length(created_by) BETWEEN 1 AND 50),
                modified_by TEXT NOT NULL CHECK (length(modified_by) BETWEEN 1 AND 50)
            );
            CREATE UNIQUE INDEX app_api_key_idx ON app (json_extract(content, '$.apiKey'));
        ",
        down: r"
            DROP INDEX IF EXISTS app_api_key_idx;
            DROP TABLE IF EXISTS app;
        ",
    },
];

/// DDL for a collection named `name`, with the envelope columns and checks
/// the document store relies on.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] if `name` is not a valid identifier.
pub fn collection_ddl(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {name} (
    id TEXT NOT NULL PRIMARY KEY CHECK (length(id) BETWEEN 1 AND 36),
    content TEXT NOT NULL CHECK (json_valid(content)),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    modified_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    created_by TEXT NOT NULL CHECK (length(created_by) BETWEEN 1 AND 50),
    modified_by TEXT NOT NULL CHECK (length(modified_by) BETWEEN 1 AND 50)
);"
    ))
}

/// DDL for an expression index over one content attribute.
///
/// The indexed expression matches the predicate `List` generates, so the
/// planner can use it.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] if either name is invalid.
pub fn content_index_ddl(collection: &str, attribute: &str) -> Result<String> {
    validate_identifier(collection)?;
    validate_identifier(attribute)?;
    Ok(format!(
        "CREATE INDEX IF NOT EXISTS {collection}_{attribute}_idx \
         ON {collection} (json_extract(content, '$.{attribute}'));"
    ))
}

/// Latest migration version known to this binary.
#[must_use]
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Version currently recorded in the database.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read.
pub fn current_version(db: &impl Queryable) -> Result<u32> {
    let version = db.query_row("PRAGMA user_version", &[], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Apply every pending migration. Returns the resulting version.
///
/// # Errors
///
/// Returns [`StoreError::UnsupportedSchemaVersion`] if the database is newer
/// than this binary, or the engine error of a failing migration (nothing from
/// the failed run is kept).
pub fn upgrade(conn: &mut Connection) -> Result<u32> {
    migrate_to(conn, latest_version())
}

/// Move the schema up or down to exactly `target`. `0` undoes everything.
///
/// # Errors
///
/// Returns [`StoreError::UnknownMigration`] for a target with no registered
/// migration, [`StoreError::UnsupportedSchemaVersion`] if the database is newer
/// than this binary, or the engine error of a failing step.
pub fn migrate_to(conn: &mut Connection, target: u32) -> Result<u32> {
    let current = current_version(&*conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(StoreError::UnsupportedSchemaVersion {
            found: current,
            latest,
        });
    }
    if target != 0 && !MIGRATIONS.iter().any(|m| m.version == target) {
        return Err(StoreError::UnknownMigration(target));
    }
    if current == target {
        debug!(version = current, "Schema already at target version");
        return Ok(current);
    }

    let tx = conn.transaction()?;
    if target > current {
        for migration in MIGRATIONS
            .iter()
            .filter(|m| m.version > current && m.version <= target)
        {
            info!(version = migration.version, description = migration.description, "Applying migration");
            tx.execute_batch(migration.up)?;
        }
    } else {
        for migration in MIGRATIONS
            .iter()
            .rev()
            .filter(|m| m.version <= current && m.version > target)
        {
            info!(version = migration.version, description = migration.description, "Reverting migration");
            tx.execute_batch(migration.down)?;
        }
    }
    tx.pragma_update(None, "user_version", target)?;
    tx.commit()?;

    info!(from = current, to = target, "Schema migrated");
    Ok(target)
}

/// Record `version` without running any migration SQL.
///
/// # Errors
///
/// Returns an error if the pragma cannot be written.
pub fn force_version(conn: &Connection, version: u32) -> Result<()> {
    info!(version, "Forcing schema version");
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}
