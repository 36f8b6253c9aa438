//! Version command implementation.

use super::open_unmigrated;
use crate::config::AppConfig;
use crate::error::Result;
use crate::format::OutputContext;
use crate::storage::schema;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionOutput {
    version: &'static str,
    /// Schema version of the configured database; absent if it does not exist yet.
    db_version: Option<u32>,
    latest_db_version: u32,
}

pub fn execute(config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let db_version = if config.db_path.exists() {
        let db = open_unmigrated(config)?;
        Some(schema::current_version(&db)?)
    } else {
        None
    };

    let output = VersionOutput {
        version: env!("CARGO_PKG_VERSION"),
        db_version,
        latest_db_version: schema::latest_version(),
    };

    ctx.emit(&output, || {
        let db = output
            .db_version
            .map_or_else(|| "none".to_string(), |v| v.to_string());
        format!(
            "stored {} (schema {db}, latest {})",
            output.version, output.latest_db_version
        )
    })
}
