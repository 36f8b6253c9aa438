//! Service health report.

use crate::storage::Database;
use crate::storage::schema;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Text reported when the database cannot be reached.
pub const DB_UNREACHABLE: &str = "Error connecting to DB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    /// Schema version recorded in the database; 0 if unknown.
    pub db_version: u32,
    pub service_version: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status_text: String,
}

impl Health {
    /// Report for a database that could not be opened or pinged.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            db_version: 0,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            status: Status::Error,
            status_text: DB_UNREACHABLE.to_string(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Ping `db` and read its schema version.
pub fn check<D: Database>(db: &D) -> Health {
    if let Err(err) = db.ping() {
        warn!(error = %err, "Health check ping failed");
        return Health::unreachable();
    }

    let service_version = env!("CARGO_PKG_VERSION").to_string();

    match schema::current_version(db) {
        Ok(db_version) => Health {
            db_version,
            service_version,
            status: Status::Ok,
            status_text: String::new(),
        },
        Err(err) => {
            warn!(error = %err, "Health check could not read schema version");
            Health {
                db_version: 0,
                service_version,
                status: Status::Error,
                status_text: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteDb;
    use serde_json::json;

    #[test]
    fn healthy_database_reports_version() {
        let db = SqliteDb::open_memory().unwrap();
        db.with_connection(schema::upgrade).unwrap();

        let health = check(&db);
        assert!(health.is_ok());
        assert_eq!(health.db_version, schema::latest_version());
        assert_eq!(health.service_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn status_serializes_lowercase() {
        let health = Health {
            service_version: "0.1.0".to_string(),
            ..Health::unreachable()
        };
        assert!(!health.is_ok());
        assert_eq!(
            serde_json::to_value(&health).unwrap(),
            json!({
                "dbVersion": 0,
                "serviceVersion": "0.1.0",
                "status": "error",
                "statusText": "Error connecting to DB"
            })
        );
    }
}
