//! Health command implementation.

use super::open_unmigrated;
use crate::config::AppConfig;
use crate::format::{OutputContext, format_health};
use crate::health::{self, Health};
use std::process::ExitCode;
use tracing::warn;

/// Prints the report; exits non-zero when the database is unhealthy.
pub fn execute(config: &AppConfig, ctx: &OutputContext) -> ExitCode {
    let report = match open_unmigrated(config) {
        Ok(db) => health::check(&db),
        Err(err) => {
            warn!(error = %err, path = %config.db_path.display(), "Cannot open database");
            Health::unreachable()
        }
    };

    if let Err(err) = ctx.emit(&report, || format_health(&report)) {
        eprintln!("{}", ctx.render_error(&err));
        return ExitCode::FAILURE;
    }

    if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
