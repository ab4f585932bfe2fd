//! Schema ingestion: turns the host's settings schema, keybindings schema and
//! default keybindings into normalized [`Setting`] / [`Command`] entries.
//!
//! Malformed individual entries are logged and skipped. A document without
//! the expected top-level shape yields an empty collection.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::models::{ArgsSchema, Catalog, Command, HasArguments, Setting, ValueType};

/// The three raw documents the catalogs are built from.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocuments {
    /// `{ "properties": { key: node }, "$defs": { .. } }`
    pub settings_schema: Value,
    /// Command-name enum, parallel descriptions, conditional argument schemas.
    pub keybindings_schema: Value,
    /// Array of `{ "key": chord, "command": id }`.
    pub default_keybindings: Value,
}

/// Knobs that are not part of the schema documents themselves.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Command key -> natural-language argument hint, used when the schema has none.
    pub argument_hints: BTreeMap<String, String>,
}

/// Build both catalogs from the raw documents.
pub fn build_catalog(docs: &SchemaDocuments, options: &IngestOptions) -> Catalog {
    let settings = ingest_settings(&docs.settings_schema);
    let commands = ingest_commands(&docs.keybindings_schema, &docs.default_keybindings, options);
    Catalog::new(settings, commands)
}

// ─── Settings ───────────────────────────────────────────────────────────────

/// Parse the default-settings schema into settings.
pub fn ingest_settings(schema: &Value) -> Vec<Setting> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        debug!("settings schema has no properties");
        return Vec::new();
    };
    let defs = local_definitions(schema);

    let mut settings = Vec::with_capacity(properties.len());
    for (key, node) in properties {
        // Language-override blocks such as `[markdown]` are not general settings.
        if key.starts_with('[') {
            continue;
        }
        match ingest_setting(key, node, defs) {
            Some(setting) => settings.push(setting),
            None => warn!(key = %key, "skipping setting with unusable schema node"),
        }
    }
    settings
}

fn local_definitions(schema: &Value) -> Option<&Map<String, Value>> {
    schema
        .get("$defs")
        .or_else(|| schema.get("definitions"))
        .and_then(Value::as_object)
}

/// Single-hop local `$ref` resolution. The property's own fields win over the
/// referenced node's fields.
fn resolve_node(node: &Value, defs: Option<&Map<String, Value>>) -> Option<Map<String, Value>> {
    let own = node.as_object()?;
    let Some(reference) = own.get("$ref") else {
        return Some(own.clone());
    };
    let name = reference
        .as_str()?
        .strip_prefix("#/$defs/")
        .or_else(|| reference.as_str()?.strip_prefix("#/definitions/"))?;
    let target = defs?.get(name)?.as_object()?;

    let mut merged = target.clone();
    for (k, v) in own {
        if k != "$ref" {
            merged.insert(k.clone(), v.clone());
        }
    }
    Some(merged)
}

fn ingest_setting(key: &str, node: &Value, defs: Option<&Map<String, Value>>) -> Option<Setting> {
    let node = resolve_node(node, defs)?;

    let mut description = node
        .get("markdownDescription")
        .and_then(Value::as_str)
        .or_else(|| node.get("description").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    if let Some(values) = string_enum(&node) {
        let descriptions = node
            .get("markdownEnumDescriptions")
            .or_else(|| node.get("enumDescriptions"))
            .and_then(Value::as_array);
        let lines = enum_documentation(&values, descriptions.map(Vec::as_slice).unwrap_or(&[]));
        if !lines.is_empty() {
            if !description.is_empty() {
                description.push('\n');
            }
            description.push_str(&lines.join("\n"));
        }
    }

    let default_value = node.get("default").cloned().unwrap_or(Value::Null);
    let value_type = match node.get("type") {
        Some(Value::String(tag)) => ValueType::from_schema_tag(tag),
        Some(_) => ValueType::Mixed,
        None => ValueType::of_value(&default_value),
    };

    Some(Setting {
        key: key.to_string(),
        description,
        default_value,
        value_type,
        restricted: node
            .get("restricted")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// The enum values of a string-enum node, or `None` when the node is not one.
fn string_enum(node: &Map<String, Value>) -> Option<Vec<&str>> {
    let values = node.get("enum")?.as_array()?;
    let strings: Vec<&str> = values.iter().filter_map(Value::as_str).collect();
    if strings.is_empty() || strings.len() != values.len() {
        return None;
    }
    Some(strings)
}

/// One line per enum value. The descriptions array may be shorter than the
/// values array; missing descriptions leave the line bare.
pub fn enum_documentation(values: &[&str], descriptions: &[Value]) -> Vec<String> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            match descriptions.get(i).and_then(Value::as_str).map(str::trim) {
                Some(desc) if !desc.is_empty() => format!("- `{}`: {}", value, desc),
                _ => format!("- `{}`", value),
            }
        })
        .collect()
}

// ─── Commands ───────────────────────────────────────────────────────────────

/// Commands whose only effect is moving focus somewhere.
pub fn is_focus_command(key: &str) -> bool {
    let last = key.rsplit('.').next().unwrap_or(key);
    last == "focus"
        || last
            .strip_prefix("focus")
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
}

/// Parse the keybindings schema and default keybindings into commands.
pub fn ingest_commands(
    keybindings_schema: &Value,
    default_keybindings: &Value,
    options: &IngestOptions,
) -> Vec<Command> {
    let Some((names, descriptions)) = command_enum(keybindings_schema) else {
        debug!("keybindings schema has no command enum");
        return Vec::new();
    };
    let arg_schemas = conditional_argument_schemas(keybindings_schema);
    let chords = default_chords(default_keybindings);

    let mut commands = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let Some(key) = name.as_str() else {
            warn!(index = i, "skipping non-string command identifier");
            continue;
        };
        let description = descriptions
            .get(i)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if description.is_empty() || is_focus_command(key) {
            continue;
        }

        let (args_schema, has_arguments) = match arg_schemas.get(key) {
            Some(Value::Bool(false)) => (None, HasArguments::No),
            Some(schema) => (Some(ArgsSchema::Schema(schema.clone())), HasArguments::Yes),
            None => match options.argument_hints.get(key) {
                Some(hint) => (Some(ArgsSchema::Hint(hint.clone())), HasArguments::Yes),
                None => (None, HasArguments::Unknown),
            },
        };

        commands.push(Command {
            key: key.to_string(),
            description: description.to_string(),
            keybinding: chords.get(key).cloned(),
            args_schema,
            has_arguments,
        });
    }
    commands
}

/// Locate the command-name enum and its parallel descriptions.
fn command_enum(schema: &Value) -> Option<(&Vec<Value>, &[Value])> {
    let candidates = [
        schema.pointer("/definitions/commandNames"),
        schema.pointer("/$defs/commandNames"),
        Some(schema),
    ];
    candidates.into_iter().flatten().find_map(|node| {
        let names = node.get("enum")?.as_array()?;
        let descriptions = node
            .get("enumDescriptions")
            .or_else(|| node.get("markdownEnumDescriptions"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Some((names, descriptions))
    })
}

/// `if: { properties: { command: { const: id } } }, then: { properties: { args: schema } }`
fn conditional_argument_schemas(schema: &Value) -> HashMap<String, Value> {
    let entries = schema
        .pointer("/definitions/commandsSchemas/allOf")
        .or_else(|| schema.pointer("/$defs/commandsSchemas/allOf"))
        .or_else(|| schema.get("allOf"))
        .and_then(Value::as_array);

    let mut out = HashMap::new();
    for entry in entries.into_iter().flatten() {
        let id = entry
            .pointer("/if/properties/command/const")
            .and_then(Value::as_str);
        let args = entry.pointer("/then/properties/args");
        match (id, args) {
            (Some(id), Some(args)) => {
                out.insert(id.to_string(), args.clone());
            }
            _ => debug!("skipping conditional schema without command/args pair"),
        }
    }
    out
}

/// First default chord per command. Removal entries (`-command`) are ignored.
fn default_chords(doc: &Value) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for binding in doc.as_array().into_iter().flatten() {
        let (Some(command), Some(chord)) = (
            binding.get("command").and_then(Value::as_str),
            binding.get("key").and_then(Value::as_str),
        ) else {
            continue;
        };
        if command.starts_with('-') {
            continue;
        }
        out.entry(command.to_string())
            .or_insert_with(|| chord.to_string());
    }
    out
}
