//! Test harness wiring the tools and loop over in-memory host collaborators.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use confpilot::catalog::{IngestOptions, StaticSchemaSource};
use confpilot::chat::{LoopOptions, Orchestrator};
use confpilot::host::{
    AutoApprove, BufferedSink, ConfirmationGate, DryRunCommandExecutor,
    InMemoryConfigurationStore,
};
use confpilot::index::ConfigurationIndex;
use confpilot::llm::LanguageModel;
use confpilot::session::{MutationLedger, TurnContext};
use confpilot::tools::{settings_tools, ToolDependencies, ToolPolicy, ToolRegistry};

use super::fixtures::sample_documents;

/// Host state shared by the tools of one test.
pub struct TestHarness {
    pub index: Arc<ConfigurationIndex>,
    pub store: Arc<InMemoryConfigurationStore>,
    pub executor: Arc<DryRunCommandExecutor>,
    pub ledger: MutationLedger,
    pub policy: ToolPolicy,
}

impl TestHarness {
    /// Harness over the sample schema documents with an empty settings store.
    pub fn new() -> Self {
        let index = ConfigurationIndex::new(
            Arc::new(StaticSchemaSource::new(sample_documents())),
            IngestOptions::default(),
        );
        Self {
            index: Arc::new(index),
            store: Arc::new(InMemoryConfigurationStore::new()),
            executor: Arc::new(DryRunCommandExecutor::new()),
            ledger: MutationLedger::new(),
            policy: ToolPolicy::default(),
        }
    }

    pub fn registry(
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
            policy: Arc::new(self.policy.clone()),
            search_limit: 50,
        })
    }

    pub fn orchestrator(&self, model: Arc<dyn LanguageModel>) -> Orchestrator {
        self.orchestrator_with_gate(model, Arc::new(AutoApprove))
    }

    pub fn orchestrator_with_gate(
        &self,
        model: Arc<dyn LanguageModel>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Orchestrator {
        let registry = Arc::new(self.registry(model.clone(), gate));
        Orchestrator::new(
            model,
            registry,
            self.index.clone(),
            self.ledger.clone(),
            LoopOptions::default(),
        )
    }
}

pub fn turn(request: &str) -> TurnContext {
    TurnContext::new(request, CancellationToken::new())
}

pub fn sink() -> BufferedSink {
    BufferedSink::new()
}
