//! Command-line interface for `stored`.

pub mod commands;

use crate::config::CliOverrides;
use crate::model::{Condition, parse_loose_json};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stored",
    version,
    about = "Typed JSON documents in SQLite, with audit envelopes and partial updates"
)]
pub struct Cli {
    /// Configuration file (default: application.yaml in ./ or up to three parents)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Actor recorded as creator/modifier (default: $USER)
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config: self.config.clone(),
            db: self.db.clone(),
            actor: self.actor.clone(),
            json: self.json.then_some(true),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply schema migrations (latest by default)
    Migrate(MigrateArgs),
    /// Show the application and database schema versions
    Version,
    /// Check database connectivity
    Health,
    /// Print the JSON Schema of a stored item
    Schema,
    /// Work with items
    #[command(subcommand)]
    Item(ItemCommand),
    /// Work with apps and their API keys
    #[command(subcommand)]
    App(AppCommand),
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Target version; 0 reverts everything
    pub version: Option<u32>,

    /// Record VERSION without running any migration
    #[arg(long, requires = "version")]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    /// Create an item
    Add(ItemAddArgs),
    /// Show one item
    Get {
        id: String,
    },
    /// Replace attributes of an item
    Patch(PatchArgs),
    /// List items matching every condition
    List(ItemListArgs),
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
    /// Id for the new item (generated when empty)
    #[arg(long, default_value = "")]
    pub id: String,

    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args, Debug)]
pub struct PatchArgs {
    pub id: String,

    /// Attribute to replace; VALUE is read as JSON, else as a string
    #[arg(long = "set", value_name = "KEY=VALUE", required = true, value_parser = parse_assignment)]
    pub set: Vec<(String, serde_json::Value)>,
}

#[derive(Args, Debug)]
pub struct ItemListArgs {
    /// Only items with exactly this name
    #[arg(long)]
    pub name: Option<String>,

    /// Condition such as `name=widget` or `rank>=3`; repeat to AND them
    #[arg(long = "where", value_name = "CONDITION", value_parser = parse_condition)]
    pub conditions: Vec<Condition>,
}

#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Register an enabled app with a fresh API key
    Add {
        /// Id for the new app (generated when empty)
        #[arg(long, default_value = "")]
        id: String,
    },
    /// Show one app
    Get {
        id: String,
    },
    /// Replace attributes of an app
    Patch(PatchArgs),
    /// List apps
    List {
        /// Only apps with this disabled flag
        #[arg(long, value_name = "BOOL")]
        disabled: Option<bool>,
    },
    /// Replace the API key of an app and print the new one
    ResetApiKey {
        id: String,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing attribute name in '{raw}'"));
    }
    Ok((key.to_string(), parse_loose_json(value)))
}

fn parse_condition(raw: &str) -> Result<Condition, String> {
    raw.parse()
}
