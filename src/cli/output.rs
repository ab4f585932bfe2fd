//! Output formatting for CLI commands.

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{ArgsSchema, CatalogEntry, Command, Setting};

/// Output mode for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

/// Print a value as pretty-printed JSON.
pub fn output_json<T: Serialize + ?Sized>(item: &T) {
    match serde_json::to_string_pretty(item) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize to JSON: {}", e)),
    }
}

/// Print a formatted table with headers and rows.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        println!("{}", "No results found.".dimmed());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(headers);

    for row in rows {
        table.add_row(row);
    }

    println!("{table}");
}

pub fn print_success(msg: &str) {
    println!("{} {}", "OK".green().bold(), msg);
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_header(title: &str) {
    println!("\n{}\n", title.bold());
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a dimmed hint/suggestion message.
pub fn print_hint(msg: &str) {
    println!("{}", msg.dimmed());
}

/// First line of `text`, cut to `max` characters.
pub fn first_line(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Compact rendering of a JSON value for table cells.
pub fn short_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One row per search hit: kind, key, value-or-keybinding, description.
pub fn entry_rows(entries: &[(CatalogEntry, Option<Value>)]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|(entry, current)| {
            let detail = match entry {
                CatalogEntry::Setting(s) => current
                    .as_ref()
                    .map(short_value)
                    .unwrap_or_else(|| short_value(&s.default_value)),
                CatalogEntry::Command(c) => c.keybinding.clone().unwrap_or_default(),
            };
            vec![
                entry.kind_str().to_string(),
                entry.key().to_string(),
                first_line(&detail, 30),
                first_line(entry.description(), 60),
            ]
        })
        .collect()
}

pub fn print_setting(setting: &Setting, current: Option<&Value>) {
    print_header(&setting.key);
    print_kv("type", &format!("{:?}", setting.value_type).to_lowercase());
    print_kv("default", &short_value(&setting.default_value));
    if let Some(current) = current {
        print_kv("current", &short_value(current));
    }
    if setting.restricted {
        print_kv("restricted", "yes (changes need confirmation)");
    }
    println!("\n{}", setting.description);
}

pub fn print_command(command: &Command) {
    print_header(&command.key);
    print_kv(
        "keybinding",
        command.keybinding.as_deref().unwrap_or("(none)"),
    );
    print_kv(
        "arguments",
        &format!("{:?}", command.has_arguments).to_lowercase(),
    );
    match &command.args_schema {
        Some(ArgsSchema::Schema(schema)) => print_kv("argument schema", &schema.to_string()),
        Some(ArgsSchema::Hint(hint)) => print_kv("argument hint", hint),
        None => {}
    }
    println!("\n{}", command.description);
}
