//! Command implementations.

pub mod app;
pub mod health;
pub mod item;
pub mod migrate;
pub mod schema;
pub mod version;

use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::Result;
use crate::format::OutputContext;
use crate::storage::SqliteDb;
use std::process::ExitCode;

/// Run `command` against the resolved configuration.
///
/// # Errors
///
/// Returns the first error raised by the command.
pub fn dispatch(command: &Commands, config: &AppConfig, ctx: &OutputContext) -> Result<ExitCode> {
    match command {
        Commands::Migrate(args) => migrate::execute(args, config, ctx)?,
        Commands::Version => version::execute(config, ctx)?,
        Commands::Health => return Ok(health::execute(config, ctx)),
        Commands::Schema => schema::execute(ctx)?,
        Commands::Item(command) => item::execute(command, config, ctx)?,
        Commands::App(command) => app::execute(command, config, ctx)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Open the configured database without applying migrations.
fn open_unmigrated(config: &AppConfig) -> Result<SqliteDb> {
    SqliteDb::open(&config.db_path, config.busy_timeout)
}
