use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// JSON type tag of a setting's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
    /// Union type or no type information.
    #[default]
    Mixed,
}

impl ValueType {
    /// Parse a JSON-Schema `type` tag. Unknown tags map to `Mixed`.
    pub fn from_schema_tag(tag: &str) -> Self {
        match tag {
            "string" => ValueType::String,
            "number" => ValueType::Number,
            "integer" => ValueType::Integer,
            "boolean" => ValueType::Boolean,
            "array" => ValueType::Array,
            "object" => ValueType::Object,
            "null" => ValueType::Null,
            _ => ValueType::Mixed,
        }
    }

    /// Infer the type from a concrete value (used when the schema omits `type`).
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueType::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
            Value::Null => ValueType::Mixed,
        }
    }
}

/// An editor setting derived from the default-settings schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Dotted identifier, e.g. `editor.fontSize`.
    pub key: String,
    /// Description, with one documentation line appended per enum value.
    pub description: String,
    pub default_value: Value,
    pub value_type: ValueType,
    /// Changing this setting requires explicit user confirmation.
    #[serde(default)]
    pub restricted: bool,
}

/// Argument descriptor for a command's single positional argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgsSchema {
    /// JSON-Schema node taken from the keybindings schema.
    Schema(Value),
    /// Natural-language hint for arguments too complex to describe by schema.
    Hint(String),
}

/// Whether a command is known to take an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HasArguments {
    /// The schema explicitly forbids arguments.
    No,
    /// An argument schema or hint is present.
    Yes,
    #[default]
    Unknown,
}

/// An editor command derived from the keybindings schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub key: String,
    pub description: String,
    /// First default key chord bound to the command, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keybinding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args_schema: Option<ArgsSchema>,
    #[serde(default)]
    pub has_arguments: HasArguments,
}

/// A searchable catalog entry: either a setting or a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    Setting(Setting),
    Command(Command),
}

impl CatalogEntry {
    pub fn key(&self) -> &str {
        match self {
            CatalogEntry::Setting(s) => &s.key,
            CatalogEntry::Command(c) => &c.key,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CatalogEntry::Setting(s) => &s.description,
            CatalogEntry::Command(c) => &c.description,
        }
    }

    /// Stable document id used by the full-text index (`setting:<key>` / `command:<key>`).
    pub fn doc_id(&self) -> String {
        match self {
            CatalogEntry::Setting(s) => format!("setting:{}", s.key),
            CatalogEntry::Command(c) => format!("command:{}", c.key),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            CatalogEntry::Setting(_) => "setting",
            CatalogEntry::Command(_) => "command",
        }
    }
}

/// Both normalized catalogs, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    settings: HashMap<String, Setting>,
    commands: HashMap<String, Command>,
}

impl Catalog {
    pub fn new(settings: Vec<Setting>, commands: Vec<Command>) -> Self {
        // Later duplicates overwrite earlier ones, keeping keys unique.
        Self {
            settings: settings.into_iter().map(|s| (s.key.clone(), s)).collect(),
            commands: commands.into_iter().map(|c| (c.key.clone(), c)).collect(),
        }
    }

    pub fn setting(&self, key: &str) -> Option<&Setting> {
        self.settings.get(key)
    }

    pub fn command(&self, key: &str) -> Option<&Command> {
        self.commands.get(key)
    }

    /// Exact key lookup across both catalogs, settings first.
    pub fn entry(&self, key: &str) -> Option<CatalogEntry> {
        self.setting(key)
            .cloned()
            .map(CatalogEntry::Setting)
            .or_else(|| self.command(key).cloned().map(CatalogEntry::Command))
    }

    /// Resolve a stored index document id back to its entry.
    pub fn by_doc_id(&self, doc_id: &str) -> Option<CatalogEntry> {
        match doc_id.split_once(':') {
            Some(("setting", key)) => self.setting(key).cloned().map(CatalogEntry::Setting),
            Some(("command", key)) => self.command(key).cloned().map(CatalogEntry::Command),
            _ => None,
        }
    }

    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.settings.values()
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn setting_count(&self) -> usize {
        self.settings.len()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty() && self.commands.is_empty()
    }
}
