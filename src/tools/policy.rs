use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Setting;

/// Which settings and commands need extra handling before the tools act.
///
/// Loaded from the `[policy]` table of `assistant.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPolicy {
    /// Commands that require explicit user confirmation before running.
    pub confirm_commands: BTreeSet<String>,
    /// Settings that require confirmation in addition to schema-restricted ones.
    pub restricted_settings: BTreeSet<String>,
    /// Commands whose arguments are checked by a nested model round-trip.
    pub complex_argument_commands: BTreeSet<String>,
    /// Command key prefixes that need the editor group focused first.
    pub focus_prefixes: Vec<String>,
    /// Fallback argument descriptions for commands without a schema.
    pub argument_hints: BTreeMap<String, String>,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            confirm_commands: ["workbench.action.resetViewLocations".to_string()]
                .into_iter()
                .collect(),
            restricted_settings: BTreeSet::new(),
            complex_argument_commands: ["vscode.setEditorLayout".to_string()]
                .into_iter()
                .collect(),
            focus_prefixes: ["editor.", "cursor", "editorScroll", "scrollLine", "scrollPage"]
                .into_iter()
                .map(String::from)
                .collect(),
            argument_hints: BTreeMap::new(),
        }
    }
}

impl ToolPolicy {
    pub fn command_requires_confirmation(&self, key: &str) -> bool {
        self.confirm_commands.contains(key)
    }

    pub fn setting_requires_confirmation(&self, setting: &Setting) -> bool {
        setting.restricted || self.restricted_settings.contains(&setting.key)
    }

    pub fn needs_argument_validation(&self, key: &str) -> bool {
        self.complex_argument_commands.contains(key)
    }

    pub fn requires_editor_focus(&self, key: &str) -> bool {
        self.focus_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}
