//! The generic document store.
//!
//! [`SqlStore`] binds one content type to one collection. Add, Get and List
//! run as single statements; Patch runs its `UPDATE … RETURNING` inside a
//! transaction and only commits once the returned content has been decoded
//! into `T`, so a patch that would corrupt the stored type never lands.

use crate::error::{Result, StoreError};
use crate::model::{Attributes, Condition, Stored};
use crate::storage::db::{Database, Queryable, Transaction};
use crate::storage::statement::{self, validate_identifier};
use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, debug_span, warn};

/// Storage for documents whose content is `T`.
pub trait Store<T> {
    /// Insert a new document. The caller supplies the id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if the id exists, [`StoreError::ConstraintViolation`]
    /// for an empty id or creator, [`StoreError::Serialization`] if `content`
    /// cannot be encoded.
    fn add(&self, creator: &str, id: &str, content: T) -> Result<Stored<T>>;

    /// Replace top-level content attributes, atomically.
    ///
    /// Attributes outside `T`'s fields are accepted, but the patched content
    /// must still decode into `T`; otherwise nothing is changed.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id, [`StoreError::ShapeViolation`]
    /// if the result no longer decodes into `T`, [`StoreError::InvalidIdentifier`]
    /// for a bad attribute name.
    fn patch(&self, updater: &str, id: &str, attributes: &Attributes) -> Result<Stored<T>>;

    /// Fetch a document by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if absent, [`StoreError::ShapeViolation`] if the
    /// stored content no longer decodes into `T`.
    fn get(&self, id: &str) -> Result<Stored<T>>;

    /// Every document matching all `conditions`; all documents when empty.
    /// Order is unspecified.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidIdentifier`] / [`StoreError::InvalidCondition`] for a
    /// bad condition, [`StoreError::ShapeViolation`] for the first undecodable row.
    fn list(&self, conditions: &[Condition]) -> Result<Vec<Stored<T>>>;
}

/// [`Store`] backed by a JSON `content` column in a relational collection.
pub struct SqlStore<T, D> {
    db: Arc<D>,
    collection: String,
    insert_sql: String,
    select_sql: String,
    _content: PhantomData<fn() -> T>,
}

impl<T, D> std::fmt::Debug for SqlStore<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<T, D> SqlStore<T, D>
where
    T: Serialize + DeserializeOwned,
    D: Database,
{
    /// Bind a store to `collection` in `db`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if `collection` is not a valid
    /// identifier.
    pub fn new(db: Arc<D>, collection: &str) -> Result<Self> {
        validate_identifier(collection)?;
        Ok(Self {
            db,
            collection: collection.to_string(),
            insert_sql: statement::insert(collection),
            select_sql: statement::select_one(collection),
            _content: PhantomData,
        })
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn parse_timestamp(&self, id: &str, value: String) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| StoreError::CorruptTimestamp {
                collection: self.collection.clone(),
                id: id.to_string(),
                value,
            })
    }

    fn decode(&self, row: RawRow) -> Result<Stored<T>> {
        let content = serde_json::from_str(&row.content).map_err(|source| {
            StoreError::ShapeViolation {
                collection: self.collection.clone(),
                id: row.id.clone(),
                source,
            }
        })?;
        Ok(Stored {
            created_at: self.parse_timestamp(&row.id, row.created_at)?,
            modified_at: self.parse_timestamp(&row.id, row.modified_at)?,
            id: row.id,
            created_by: row.created_by,
            modified_by: row.modified_by,
            content,
        })
    }
}

impl<T, D> Store<T> for SqlStore<T, D>
where
    T: Serialize + DeserializeOwned,
    D: Database,
{
    fn add(&self, creator: &str, id: &str, content: T) -> Result<Stored<T>> {
        let _span = debug_span!("store.add", collection = %self.collection, id).entered();

        let content_json = serde_json::to_string(&content)
            .map_err(|source| StoreError::serialization(format!("content of '{id}'"), source))?;

        let (created_at, modified_at): (String, String) = self
            .db
            .query_row(&self.insert_sql, &[&id, &content_json, &creator], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .map_err(|err| StoreError::from_write(&self.collection, id, err))?;

        debug!(creator, "Document added");
        Ok(Stored {
            id: id.to_string(),
            created_at: self.parse_timestamp(id, created_at)?,
            modified_at: self.parse_timestamp(id, modified_at)?,
            created_by: creator.to_string(),
            modified_by: creator.to_string(),
            content,
        })
    }

    fn patch(&self, updater: &str, id: &str, attributes: &Attributes) -> Result<Stored<T>> {
        let _span = debug_span!("store.patch", collection = %self.collection, id).entered();

        let stmt = statement::patch(&self.collection, attributes)?;
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(stmt.values.len() + 2);
        params.push(&updater);
        params.push(&id);
        params.extend(stmt.values.iter().map(|value| value as &dyn ToSql));

        // Dropping `tx` on any early return below rolls the update back.
        let tx = self.db.begin()?;
        let row = tx
            .query_row(&stmt.sql, &params, RawRow::from_row)
            .map_err(|err| StoreError::from_write(&self.collection, id, err))?;
        let patched = match self.decode(row) {
            Ok(patched) => patched,
            Err(err) => {
                warn!(error = %err, "Patch rejected, rolling back");
                return Err(err);
            }
        };
        tx.commit()?;

        debug!(updater, attributes = attributes.len(), "Document patched");
        Ok(patched)
    }

    fn get(&self, id: &str) -> Result<Stored<T>> {
        let _span = debug_span!("store.get", collection = %self.collection, id).entered();

        let row = self
            .db
            .query_row(&self.select_sql, &[&id], RawRow::from_row)
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                    collection: self.collection.clone(),
                    id: id.to_string(),
                },
                other => StoreError::Database(other),
            })?;
        self.decode(row)
    }

    fn list(&self, conditions: &[Condition]) -> Result<Vec<Stored<T>>> {
        let _span = debug_span!("store.list", collection = %self.collection).entered();

        let stmt = statement::list(&self.collection, conditions)?;
        let params: Vec<&dyn ToSql> = stmt.values.iter().map(|value| value as &dyn ToSql).collect();

        let rows = self.db.query(&stmt.sql, &params, RawRow::from_row)?;
        debug!(conditions = conditions.len(), rows = rows.len(), "Documents listed");
        rows.into_iter().map(|row| self.decode(row)).collect()
    }
}

/// Envelope columns as read from the engine, before decoding.
struct RawRow {
    id: String,
    content: String,
    created_by: String,
    created_at: String,
    modified_by: String,
    modified_at: String,
}

impl RawRow {
    /// Map a row selected with [`statement::COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            created_by: row.get(2)?,
            created_at: row.get(3)?,
            modified_by: row.get(4)?,
            modified_at: row.get(5)?,
        })
    }
}
