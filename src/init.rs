//! Shared wiring for CLI commands.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::{FileSchemaSource, IngestOptions};
use crate::chat::{LoopOptions, Orchestrator, TranscriptFile};
use crate::config::{load_config, resolve_data_path, AssistantConfig};
use crate::host::{ConfirmationGate, DryRunCommandExecutor, JsonFileConfigurationStore};
use crate::index::ConfigurationIndex;
use crate::llm::LanguageModel;
use crate::session::MutationLedger;
use crate::tools::{settings_tools, ToolDependencies, ToolRegistry, SETTINGS_TAG};

/// Application context holding the index, host collaborators and config.
pub struct AppContext {
    pub data_path: PathBuf,
    pub config: AssistantConfig,
    pub index: Arc<ConfigurationIndex>,
    pub store: Arc<JsonFileConfigurationStore>,
    pub executor: Arc<DryRunCommandExecutor>,
    pub ledger: MutationLedger,
    pub transcript: TranscriptFile,
}

impl AppContext {
    /// Data path priority: explicit path > CONFPILOT_DATA_PATH env > ./.confpilot (if exists) > ~/.confpilot
    ///
    /// The index is not built here; the first search builds it.
    pub fn new(explicit_path: Option<PathBuf>) -> Result<Self> {
        let data_path = resolve_data_path(explicit_path);
        tracing::info!("Using data path: {}", data_path.display());

        let config = load_config(&data_path);
        let schemas = config.schemas.resolve(&data_path);

        let source = Arc::new(FileSchemaSource::new(
            schemas.settings_schema,
            schemas.keybindings_schema,
            schemas.default_keybindings,
        ));
        let options = IngestOptions {
            argument_hints: config.policy.argument_hints.clone(),
        };
        let index = Arc::new(ConfigurationIndex::new(source, options));
        let store = Arc::new(JsonFileConfigurationStore::new(schemas.user_settings));
        let transcript = TranscriptFile::new(data_path.join("transcript.json"));

        Ok(Self {
            data_path,
            config,
            index,
            store,
            executor: Arc::new(DryRunCommandExecutor::new()),
            ledger: MutationLedger::new(),
            transcript,
        })
    }

    pub fn tools(
        &self,
        model: Arc<dyn LanguageModel>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> ToolRegistry {
        settings_tools(ToolDependencies {
            index: self.index.clone(),
            store: self.store.clone(),
            executor: self.executor.clone(),
            gate,
            ledger: self.ledger.clone(),
            model,
            policy: Arc::new(self.config.policy.clone()),
            search_limit: self.config.search_limit,
        })
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            history_turns: self.config.history_turns,
            max_rounds: self.config.max_rounds(),
            tool_tag: SETTINGS_TAG,
        }
    }

    pub fn orchestrator(
        &self,
        model: Arc<dyn LanguageModel>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Orchestrator {
        let registry = Arc::new(self.tools(model.clone(), gate));
        Orchestrator::new(
            model,
            registry,
            self.index.clone(),
            self.ledger.clone(),
            self.loop_options(),
        )
    }
}
