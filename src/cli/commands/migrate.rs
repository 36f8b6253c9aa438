//! Migrate command implementation.

use super::open_unmigrated;
use crate::cli::MigrateArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::format::OutputContext;
use crate::storage::schema;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MigrateOutput {
    previous_version: u32,
    version: u32,
    forced: bool,
}

pub fn execute(args: &MigrateArgs, config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let db = open_unmigrated(config)?;

    let output = db.with_connection(|conn| -> Result<MigrateOutput> {
        let previous_version = schema::current_version(&*conn)?;
        let (version, forced) = match (args.version, args.force) {
            (Some(version), true) => {
                schema::force_version(conn, version)?;
                (version, true)
            }
            (Some(version), false) => (schema::migrate_to(conn, version)?, false),
            (None, _) => (schema::upgrade(conn)?, false),
        };
        Ok(MigrateOutput {
            previous_version,
            version,
            forced,
        })
    })?;

    info!(
        from = output.previous_version,
        to = output.version,
        forced = output.forced,
        "Migrate command finished"
    );

    ctx.emit(&output, || {
        if output.forced {
            format!("Schema version forced to {}", output.version)
        } else if output.previous_version == output.version {
            format!("Schema already at version {}", output.version)
        } else {
            format!(
                "Schema migrated from version {} to {}",
                output.previous_version, output.version
            )
        }
    })
}
