//! Item command implementations: add, get, patch, list.

use crate::cli::{ItemAddArgs, ItemCommand, ItemListArgs, PatchArgs};
use crate::config::{self, AppConfig};
use crate::domain::{ITEM_COLLECTION, Item};
use crate::error::Result;
use crate::format::{OutputContext, format_document, format_document_line};
use crate::model::{Attributes, Condition, Stored};
use crate::storage::{SqlStore, SqliteDb, Store};
use tracing::{debug, info};
use uuid::Uuid;

type ItemStore = SqlStore<Item, SqliteDb>;

pub fn execute(command: &ItemCommand, config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let store = ItemStore::new(config::open_database(config)?, ITEM_COLLECTION)?;
    match command {
        ItemCommand::Add(args) => add(&store, args, config, ctx),
        ItemCommand::Get { id } => {
            let item = store.get(id)?;
            ctx.emit(&item, || format_document(&item))
        }
        ItemCommand::Patch(args) => patch(&store, args, config, ctx),
        ItemCommand::List(args) => list(&store, args, ctx),
    }
}

fn add(store: &ItemStore, args: &ItemAddArgs, config: &AppConfig, ctx: &OutputContext) -> Result<()> {
    let id = if args.id.trim().is_empty() {
        Uuid::new_v4().to_string()
    } else {
        args.id.clone()
    };
    let content = Item {
        name: args.name.clone(),
        description: args.description.clone(),
    };

    let item = store.add(&config.resolve_actor(), &id, content)?;
    info!(collection = store.collection(), id = %item.id, "Created item");
    ctx.emit(&item, || format_document(&item))
}

fn patch(
    store: &ItemStore,
    args: &PatchArgs,
    config: &AppConfig,
    ctx: &OutputContext,
) -> Result<()> {
    let attributes: Attributes = args.set.iter().cloned().collect();
    let item = store.patch(&config.resolve_actor(), &args.id, &attributes)?;
    info!(
        collection = store.collection(),
        id = %item.id,
        attributes = attributes.len(),
        "Patched item"
    );
    ctx.emit(&item, || format_document(&item))
}

fn list(store: &ItemStore, args: &ItemListArgs, ctx: &OutputContext) -> Result<()> {
    let mut conditions = args.conditions.clone();
    if let Some(name) = &args.name {
        conditions.push(Condition::eq("name", name.as_str()));
    }

    let mut items = store.list(&conditions)?;
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    debug!(count = items.len(), "Listed items");

    ctx.emit(&items, || render_list(&items))
}

fn render_list(items: &[Stored<Item>]) -> String {
    if items.is_empty() {
        return "No items found.".to_string();
    }
    items
        .iter()
        .map(|item| format_document_line(item, &item.content.name))
        .collect::<Vec<_>>()
        .join("\n")
}
