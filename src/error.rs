//! Error types for the document store and its collaborators.
//!
//! Every store operation returns [`StoreError`]. The variants map onto a small,
//! stable taxonomy ([`ErrorCode`]) so callers can tell a missing document apart
//! from a conflict or an engine failure without matching on messages.

use rusqlite::ffi;
use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors produced by the store, schema provisioning and configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document '{id}' not found in {collection}")]
    NotFound { collection: String, id: String },

    #[error("a document with the id '{id}' already exists in {collection}")]
    Conflict { collection: String, id: String },

    #[error("constraint violation in {collection}: {message}")]
    ConstraintViolation { collection: String, message: String },

    #[error("failed to serialize {context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("content of '{id}' in {collection} does not match the expected shape: {source}")]
    ShapeViolation {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid timestamp '{value}' on '{id}' in {collection}")]
    CorruptTimestamp {
        collection: String,
        id: String,
        value: String,
    },

    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },

    #[error("invalid condition on '{attribute}': {reason}")]
    InvalidCondition { attribute: String, reason: String },

    #[error("database schema version {found} is newer than supported {latest}")]
    UnsupportedSchemaVersion { found: u32, latest: u32 },

    #[error("no migration with version {0}")]
    UnknownMigration(u32),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Machine-readable error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Conflict,
    ConstraintViolation,
    Serialization,
    ShapeViolation,
    InvalidInput,
    Schema,
    Config,
    Io,
    Database,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::ConstraintViolation => "CONSTRAINT_VIOLATION",
            Self::Serialization => "SERIALIZATION",
            Self::ShapeViolation => "SHAPE_VIOLATION",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Schema => "SCHEMA",
            Self::Config => "CONFIG",
            Self::Io => "IO",
            Self::Database => "DATABASE",
        }
    }

    /// Process exit code used by the CLI.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::NotFound => 3,
            Self::Conflict => 4,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::ConstraintViolation { .. } => ErrorCode::ConstraintViolation,
            Self::Serialization { .. } => ErrorCode::Serialization,
            Self::ShapeViolation { .. } | Self::CorruptTimestamp { .. } => {
                ErrorCode::ShapeViolation
            }
            Self::InvalidIdentifier { .. } | Self::InvalidCondition { .. } => {
                ErrorCode::InvalidInput
            }
            Self::UnsupportedSchemaVersion { .. } | Self::UnknownMigration(_) => ErrorCode::Schema,
            Self::Config(_) | Self::Yaml(_) => ErrorCode::Config,
            Self::Io(_) => ErrorCode::Io,
            Self::Database(_) => ErrorCode::Database,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Classify an engine error raised while writing `id` into `collection`.
    ///
    /// Primary-key and unique violations become [`StoreError::Conflict`], every
    /// other constraint failure becomes [`StoreError::ConstraintViolation`], and
    /// the rest is passed through untouched.
    pub(crate) fn from_write(collection: &str, id: &str, err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                        Self::Conflict {
                            collection: collection.to_string(),
                            id: id.to_string(),
                        }
                    }
                    _ => Self::ConstraintViolation {
                        collection: collection.to_string(),
                        message: message.unwrap_or_else(|| failure.to_string()),
                    },
                }
            }
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            other => Self::Database(other),
        }
    }
}

/// Serializable error body, shaped like `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&StoreError> for ErrorResponse {
    fn from(err: &StoreError) -> Self {
        Self {
            error: ErrorDetail {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint_failure(extended_code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code,
            },
            Some(message.to_string()),
        )
    }

    #[test]
    fn primary_key_violation_is_conflict() {
        let err = StoreError::from_write(
            "item",
            "id1",
            constraint_failure(ffi::SQLITE_CONSTRAINT_PRIMARYKEY, "UNIQUE constraint failed"),
        );
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(
            err.to_string(),
            "a document with the id 'id1' already exists in item"
        );
    }

    #[test]
    fn check_violation_keeps_engine_message() {
        let err = StoreError::from_write(
            "item",
            "",
            constraint_failure(ffi::SQLITE_CONSTRAINT_CHECK, "CHECK constraint failed: id"),
        );
        match err {
            StoreError::ConstraintViolation { collection, message } => {
                assert_eq!(collection, "item");
                assert!(message.contains("CHECK"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn no_rows_is_not_found() {
        let err = StoreError::from_write("item", "ghost", rusqlite::Error::QueryReturnedNoRows);
        assert!(err.is_not_found());
        assert_eq!(err.code().exit_code(), 3);
    }

    #[test]
    fn error_response_shape() {
        let err = StoreError::NotFound {
            collection: "item".to_string(),
            id: "x".to_string(),
        };
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "document 'x' not found in item");
    }
}
