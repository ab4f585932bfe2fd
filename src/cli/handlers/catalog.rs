//! Catalog handlers: search, lookup and the tool manifest.

use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::catalog::CatalogEntry;
use crate::cli::output::{
    entry_rows, output_json, print_command, print_hint, print_setting, print_table, OutputMode,
};
use crate::host::{AlwaysDecline, ConfigurationStore};
use crate::init::AppContext;
use crate::llm::OpenAiCompatibleModel;

pub async fn handle_search(
    ctx: &AppContext,
    keywords: &str,
    limit: usize,
    mode: OutputMode,
) -> Result<()> {
    let entries = ctx.index.search(keywords, limit).await?;

    let mut annotated: Vec<(CatalogEntry, Option<Value>)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let current = match &entry {
            CatalogEntry::Setting(s) => ctx.store.get(&s.key).await,
            CatalogEntry::Command(_) => None,
        };
        annotated.push((entry, current));
    }

    if mode == OutputMode::Json {
        let items: Vec<Value> = annotated
            .iter()
            .map(|(entry, current)| json!({ "entry": entry, "current_value": current }))
            .collect();
        output_json(&items);
        return Ok(());
    }

    let count = annotated.len();
    print_table(
        &["Kind", "Key", "Value / Keybinding", "Description"],
        entry_rows(&annotated),
    );
    if count == limit {
        print_hint(&format!("Showing first {} results. Use --limit for more.", limit));
    }
    Ok(())
}

pub async fn handle_lookup(ctx: &AppContext, key: &str, mode: OutputMode) -> Result<()> {
    let catalog = ctx.index.catalog().await?;
    let Some(entry) = catalog.entry(key) else {
        let near = ctx.index.nearest_commands(key, 3).await?;
        if near.is_empty() {
            anyhow::bail!("No setting or command named '{}'", key);
        }
        anyhow::bail!(
            "No setting or command named '{}'. Did you mean: {}?",
            key,
            near.join(", ")
        );
    };

    match entry {
        CatalogEntry::Setting(setting) => {
            let current = ctx.store.get(&setting.key).await;
            if mode == OutputMode::Json {
                output_json(&json!({ "entry": CatalogEntry::Setting(setting), "current_value": current }));
            } else {
                print_setting(&setting, current.as_ref());
            }
        }
        CatalogEntry::Command(command) => {
            if mode == OutputMode::Json {
                output_json(&CatalogEntry::Command(command));
            } else {
                print_command(&command);
            }
        }
    }
    Ok(())
}

/// The manifest is independent of the model and gate; placeholders are used.
pub fn handle_manifest(ctx: &AppContext) -> Result<()> {
    let model = Arc::new(OpenAiCompatibleModel::new(&ctx.config.model)?);
    let registry = ctx.tools(model, Arc::new(AlwaysDecline));
    output_json(&registry.manifest(ctx.loop_options().tool_tag));
    Ok(())
}
