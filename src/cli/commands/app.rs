//! App command implementations: add, get, patch, list, reset-api-key.

use crate::cli::{AppCommand, PatchArgs};
use crate::config::{self, AppConfig};
use crate::domain::{APP_COLLECTION, App};
use crate::error::Result;
use crate::format::{OutputContext, format_document, format_document_line};
use crate::model::{Attributes, Condition, Stored, attributes_of};
use crate::storage::{SqlStore, SqliteDb, Store};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

type AppStore = SqlStore<App, SqliteDb>;

#[derive(Serialize)]
struct ApiKeyReset {
    #[serde(rename = "apiKey")]
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetOutput<'a> {
    id: &'a str,
    api_key: &'a str,
}

pub fn execute(command: &AppCommand, config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let store = AppStore::new(config::open_database(config)?, APP_COLLECTION)?;
    match command {
        AppCommand::Add { id } => add(&store, id, config, ctx),
        AppCommand::Get { id } => {
            let app = store.get(id)?;
            ctx.emit(&app, || format_document(&app))
        }
        AppCommand::Patch(args) => patch(&store, args, config, ctx),
        AppCommand::List { disabled } => list(&store, *disabled, ctx),
        AppCommand::ResetApiKey { id } => reset_api_key(&store, id, config, ctx),
    }
}

fn new_api_key() -> String {
    Uuid::new_v4().to_string()
}

fn add(store: &AppStore, id: &str, config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let id = if id.trim().is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id.to_string()
    };
    let content = App {
        api_key: new_api_key(),
        disabled: false,
    };

    let app = store.add(&config.resolve_actor(), &id, content)?;
    info!(collection = store.collection(), id = %app.id, "Registered app");
    ctx.emit(&app, || format_document(&app))
}

fn patch(store: &AppStore, args: &PatchArgs, config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let attributes: Attributes = args.set.iter().cloned().collect();
    let app = store.patch(&config.resolve_actor(), &args.id, &attributes)?;
    info!(
        collection = store.collection(),
        id = %app.id,
        attributes = attributes.len(),
        "Patched app"
    );
    ctx.emit(&app, || format_document(&app))
}

fn list(store: &AppStore, disabled: Option<bool>, ctx: &OutputContext) -> Result<()> {
    let conditions: Vec<Condition> = disabled
        .map(|flag| Condition::eq("disabled", flag))
        .into_iter()
        .collect();

    let mut apps = store.list(&conditions)?;
    apps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    debug!(count = apps.len(), "Listed apps");

    ctx.emit(&apps, || render_list(&apps))
}

fn reset_api_key(store: &AppStore, id: &str, config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let attributes = attributes_of(&ApiKeyReset {
        api_key: new_api_key(),
    })?;
    let app = store.patch(&config.resolve_actor(), id, &attributes)?;
    info!(collection = store.collection(), id = %app.id, "Reset API key");

    let output = ResetOutput {
        id: &app.id,
        api_key: &app.content.api_key,
    };
    ctx.emit(&output, || app.content.api_key.clone())
}

fn render_list(apps: &[Stored<App>]) -> String {
    if apps.is_empty() {
        return "No apps found.".to_string();
    }
    apps.iter()
        .map(|app| {
            let label = if app.content.disabled { "disabled" } else { "enabled" };
            format_document_line(app, label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
