//! `assistant.toml` configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tools::ToolPolicy;

pub const CONFIG_FILE: &str = "assistant.toml";

/// Chat-completions endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: None,
        }
    }
}

impl ModelConfig {
    /// `CONFPILOT_API_KEY`, else the variable named by `api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("CONFPILOT_API_KEY")
            .or_else(|_| std::env::var(&self.api_key_env))
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Locations of the schema documents and the user settings file.
/// Relative paths resolve against the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaPaths {
    pub settings_schema: PathBuf,
    pub keybindings_schema: PathBuf,
    pub default_keybindings: PathBuf,
    pub user_settings: PathBuf,
}

impl Default for SchemaPaths {
    fn default() -> Self {
        Self {
            settings_schema: "settings-schema.json".into(),
            keybindings_schema: "keybindings-schema.json".into(),
            default_keybindings: "default-keybindings.json".into(),
            user_settings: "settings.json".into(),
        }
    }
}

impl SchemaPaths {
    pub fn resolve(&self, data_path: &Path) -> Self {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                data_path.join(p)
            }
        };
        Self {
            settings_schema: join(&self.settings_schema),
            keybindings_schema: join(&self.keybindings_schema),
            default_keybindings: join(&self.default_keybindings),
            user_settings: join(&self.user_settings),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: ModelConfig,
    pub schemas: SchemaPaths,
    pub history_turns: usize,
    /// 0 disables the cap.
    pub max_rounds: usize,
    pub search_limit: usize,
    pub policy: ToolPolicy,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            schemas: SchemaPaths::default(),
            history_turns: 5,
            max_rounds: 25,
            search_limit: 50,
            policy: ToolPolicy::default(),
        }
    }
}

impl AssistantConfig {
    pub fn max_rounds(&self) -> Option<usize> {
        (self.max_rounds > 0).then_some(self.max_rounds)
    }
}

/// Load configuration: `{data_path}/assistant.toml` first, then
/// `CONFPILOT_MODEL_ENDPOINT` / `CONFPILOT_MODEL` env vars, then defaults.
pub fn load_config(data_path: &Path) -> AssistantConfig {
    let config_path = data_path.join(CONFIG_FILE);
    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<AssistantConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded assistant config from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse {}: {}. Using default.",
                        config_path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {}. Using default.",
                    config_path.display(),
                    e
                );
            }
        }
    }

    let mut config = AssistantConfig::default();
    if let Ok(endpoint) = std::env::var("CONFPILOT_MODEL_ENDPOINT") {
        tracing::info!("Using model endpoint from CONFPILOT_MODEL_ENDPOINT env");
        config.model.endpoint = endpoint;
    }
    if let Ok(model) = std::env::var("CONFPILOT_MODEL") {
        config.model.model = model;
    }
    config
}

/// Data path priority: explicit path > CONFPILOT_DATA_PATH env > ./.confpilot (if exists) > ~/.confpilot
pub fn resolve_data_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path
        .or_else(|| std::env::var("CONFPILOT_DATA_PATH").ok().map(PathBuf::from))
        .or_else(|| {
            let local_path = Path::new(".confpilot");
            if local_path.exists() && local_path.is_dir() {
                Some(local_path.to_path_buf())
            } else {
                None
            }
        })
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".confpilot"))
                .unwrap_or_else(|| PathBuf::from(".confpilot"))
        })
}
