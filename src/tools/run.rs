use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::catalog::Command;
use crate::host::{CommandExecutor, ConfirmationGate, ConfirmationItem, ConfirmationRequest};
use crate::index::ConfigurationIndex;
use crate::session::{CommandRun, MutationLedger, TurnContext};

use super::validation::{ArgumentValidator, Verdict};
use super::{input_schema, parse_input, Tool, ToolFailure, ToolPolicy, ToolResult, ToolStatus};

/// How many near-miss command keys a NotFound result lists.
const SUGGESTION_COUNT: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunCommandInput {
    /// Exact command identifier, e.g. "workbench.action.togglePanel"
    pub key: String,
    /// JSON-encoded array of positional arguments, e.g. "[{\"orientation\": 0}]"
    #[serde(default, rename = "argumentsArray", alias = "arguments_array")]
    pub arguments_array: Option<String>,
}

/// Dispatches a catalog command to the host.
pub struct RunCommandTool {
    index: Arc<ConfigurationIndex>,
    executor: Arc<dyn CommandExecutor>,
    gate: Arc<dyn ConfirmationGate>,
    ledger: MutationLedger,
    policy: Arc<ToolPolicy>,
    validator: ArgumentValidator,
}

impl RunCommandTool {
    pub fn new(
        index: Arc<ConfigurationIndex>,
        executor: Arc<dyn CommandExecutor>,
        gate: Arc<dyn ConfirmationGate>,
        ledger: MutationLedger,
        policy: Arc<ToolPolicy>,
        validator: ArgumentValidator,
    ) -> Self {
        Self {
            index,
            executor,
            gate,
            ledger,
            policy,
            validator,
        }
    }

    async fn run(&self, input: RunCommandInput, ctx: &TurnContext) -> Result<ToolResult, ToolFailure> {
        let key = input.key.trim();
        if key.is_empty() {
            return Err(ToolFailure::InvalidArguments("key must not be empty".into()));
        }

        let command = self
            .index
            .get_command(key)
            .await
            .map_err(|e| ToolFailure::PersistenceFailure(e.to_string()))?;
        let Some(command) = command else {
            let suggestions = self
                .index
                .nearest_commands(key, SUGGESTION_COUNT)
                .await
                .unwrap_or_default();
            return Err(ToolFailure::NotFound {
                kind: "Command",
                key: key.to_string(),
                suggestions,
            });
        };

        let args = parse_arguments(&command.key, input.arguments_array.as_deref());

        if self.policy.needs_argument_validation(&command.key) {
            if let Some(candidate) = args.first() {
                match self.validator.validate(ctx, &command, candidate).await {
                    Verdict::Valid => {}
                    Verdict::Cancelled => return Err(ToolFailure::Cancelled),
                    Verdict::Corrected { argument, reason } => {
                        return Ok(correction_result(&command, &argument, &reason));
                    }
                }
            }
        }

        if self.policy.command_requires_confirmation(&command.key) {
            self.confirm(&command, &args).await?;
        }

        if ctx.is_cancelled() {
            return Err(ToolFailure::Cancelled);
        }

        if self.policy.requires_editor_focus(&command.key) {
            if let Err(e) = self.executor.focus_active_editor_group().await {
                warn!(command = %command.key, error = %e, "could not focus editor group");
            }
        }

        let returned = self
            .executor
            .execute(&command.key, &args)
            .await
            .map_err(|e| {
                ToolFailure::PersistenceFailure(format!("command `{}` failed: {}", command.key, e))
            })?;

        self.ledger
            .record_command(CommandRun {
                key: command.key.clone(),
                arguments: args,
            })
            .await;
        info!(command = %command.key, "command executed");

        let mut message = match returned {
            None | Some(Value::Null) => format!("Command `{}` was executed.", command.key),
            Some(value) => format!(
                "Command `{}` was executed and returned: {}",
                command.key, value
            ),
        };
        if let Some(chord) = &command.keybinding {
            message.push_str(&format!(" Its keybinding is {}.", chord));
        }
        Ok(ToolResult::success(message))
    }

    async fn confirm(&self, command: &Command, args: &[Value]) -> Result<(), ToolFailure> {
        let request = ConfirmationRequest {
            title: format!("Run {}?", command.key),
            message: command.description.clone(),
            items: vec![ConfirmationItem {
                key: command.key.clone(),
                value: Value::Array(args.to_vec()),
                description: command.description.clone(),
            }],
        };
        if self.gate.confirm(&request).await {
            Ok(())
        } else {
            Err(ToolFailure::Declined(format!(
                "command `{}` was not run",
                command.key
            )))
        }
    }
}

/// Positional arguments from the JSON-encoded list. A bare value becomes a
/// single argument; unparseable input means no arguments.
fn parse_arguments(key: &str, raw: Option<&str>) -> Vec<Value> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => Vec::new(),
        Ok(single) => vec![single],
        Err(e) => {
            warn!(command = key, error = %e, "ignoring unparseable command arguments");
            Vec::new()
        }
    }
}

fn correction_result(command: &Command, argument: &str, reason: &str) -> ToolResult {
    let mut content = format!(
        "The arguments for `{}` do not match what the user asked for",
        command.key
    );
    if !reason.is_empty() {
        content.push_str(&format!(" ({})", reason));
    }
    content.push_str(". The command was not run.");
    if argument.is_empty() {
        content.push_str(" Build a new argument from the command's schema and call run_command again.");
    } else {
        content.push_str(&format!(
            " Call run_command again with argumentsArray set to [{}].",
            argument
        ));
    }
    ToolResult::with_status(ToolStatus::Retry, content)
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &'static str {
        "run_command"
    }

    fn description(&self) -> &'static str {
        "Run an editor command by its exact key. Optional arguments are passed as a \
         JSON-encoded array in argumentsArray. Use search_configurations first to find the key."
    }

    fn input_schema(&self) -> Value {
        input_schema::<RunCommandInput>()
    }

    #[instrument(name = "tool.run_command", skip_all)]
    async fn invoke(&self, args: Value, ctx: &TurnContext) -> ToolResult {
        let result = match parse_input::<RunCommandInput>(args) {
            Ok(input) => self.run(input, ctx).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(ToolResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IngestOptions, SchemaDocuments, StaticSchemaSource};
    use crate::chat::ResponsePart;
    use crate::host::{AlwaysDecline, AutoApprove, DryRunCommandExecutor};
    use crate::llm::{LanguageModel, ModelRequest, ResponseStream};
    use crate::AssistantError;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    /// Model that always answers with the same text.
    struct Fixed(&'static str);

    #[async_trait]
    impl LanguageModel for Fixed {
        async fn send(
            &self,
            _request: ModelRequest,
            _cancel: CancellationToken,
        ) -> Result<ResponseStream, AssistantError> {
            Ok(Box::pin(futures::stream::iter(vec![Ok(ResponsePart::Text(
                self.0.to_string(),
            ))])))
        }
    }

    fn index() -> Arc<ConfigurationIndex> {
        let docs = SchemaDocuments {
            settings_schema: json!({"properties": {}}),
            keybindings_schema: json!({
                "enum": [
                    "workbench.action.togglePanel",
                    "workbench.action.resetViewLocations",
                    "vscode.setEditorLayout",
                    "editor.action.formatDocument"
                ],
                "enumDescriptions": [
                    "Toggle Panel Visibility",
                    "Reset View Locations",
                    "Set Editor Layout",
                    "Format Document"
                ]
            }),
            default_keybindings: json!([
                {"key": "ctrl+j", "command": "workbench.action.togglePanel"}
            ]),
        };
        Arc::new(ConfigurationIndex::new(
            Arc::new(StaticSchemaSource::new(docs)),
            IngestOptions::default(),
        ))
    }

    fn tool(
        executor: Arc<DryRunCommandExecutor>,
        gate: Arc<dyn ConfirmationGate>,
        ledger: MutationLedger,
        judge: &'static str,
    ) -> RunCommandTool {
        RunCommandTool::new(
            index(),
            executor,
            gate,
            ledger,
            Arc::new(ToolPolicy::default()),
            ArgumentValidator::new(Arc::new(Fixed(judge))),
        )
    }

    fn ctx() -> TurnContext {
        TurnContext::new("toggle the panel", CancellationToken::new())
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments("k", None), Vec::<Value>::new());
        assert_eq!(parse_arguments("k", Some("[1, \"a\"]")), vec![json!(1), json!("a")]);
        assert_eq!(parse_arguments("k", Some("{\"a\": 1}")), vec![json!({"a": 1})]);
        assert_eq!(parse_arguments("k", Some("not json")), Vec::<Value>::new());
    }

    #[tokio::test]
    async fn test_unknown_command_not_executed() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        let result = tool(executor.clone(), Arc::new(AutoApprove), MutationLedger::new(), "VALID")
            .invoke(json!({"key": "workbench.action.togglePanl"}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::NotFound);
        assert!(result.content.contains("workbench.action.togglePanel"));
        assert!(executor.executed().is_empty());
    }

    #[tokio::test]
    async fn test_executes_and_records() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        let ledger = MutationLedger::new();
        let result = tool(executor.clone(), Arc::new(AutoApprove), ledger.clone(), "VALID")
            .invoke(
                json!({"key": "workbench.action.togglePanel", "argumentsArray": "oops"}),
                &ctx(),
            )
            .await;
        assert_eq!(result.status, ToolStatus::Success);
        assert!(result.content.contains("was executed"));
        assert!(result.content.contains("ctrl+j"));
        assert_eq!(executor.executed().len(), 1);
        assert!(executor.executed()[0].args.is_empty());
        assert_eq!(ledger.snapshot().await.commands.len(), 1);
        assert_eq!(executor.focus_requests(), 0);
    }

    #[tokio::test]
    async fn test_return_value_reported() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        executor.return_value("workbench.action.togglePanel", json!({"visible": true}));
        let result = tool(executor, Arc::new(AutoApprove), MutationLedger::new(), "VALID")
            .invoke(json!({"key": "workbench.action.togglePanel"}), &ctx())
            .await;
        assert!(result.content.contains("returned: {\"visible\":true}"));
    }

    #[tokio::test]
    async fn test_failure_reported_and_not_ledgered() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        executor.fail_with("workbench.action.togglePanel", "no panel");
        let ledger = MutationLedger::new();
        let result = tool(executor, Arc::new(AutoApprove), ledger.clone(), "VALID")
            .invoke(json!({"key": "workbench.action.togglePanel"}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::PersistenceFailure);
        assert!(result.content.contains("no panel"));
        assert!(ledger.snapshot().await.commands.is_empty());
    }

    #[tokio::test]
    async fn test_editor_commands_focus_first() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        tool(executor.clone(), Arc::new(AutoApprove), MutationLedger::new(), "VALID")
            .invoke(json!({"key": "editor.action.formatDocument"}), &ctx())
            .await;
        assert_eq!(executor.focus_requests(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_declined() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        let result = tool(executor.clone(), Arc::new(AlwaysDecline), MutationLedger::new(), "VALID")
            .invoke(json!({"key": "workbench.action.resetViewLocations"}), &ctx())
            .await;
        assert_eq!(result.status, ToolStatus::Declined);
        assert!(executor.executed().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_layout_returns_retry_without_executing() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        let tool = tool(executor.clone(), Arc::new(AutoApprove), MutationLedger::new(), "INVALID: wrong shape");
        let ctx = ctx();
        let args = json!({"key": "vscode.setEditorLayout", "argumentsArray": "[{\"groups\": 2}]"});

        let first = tool.invoke(args.clone(), &ctx).await;
        assert_eq!(first.status, ToolStatus::Retry);
        assert!(executor.executed().is_empty());

        // Same turn: validation is not repeated.
        let second = tool.invoke(args, &ctx).await;
        assert_eq!(second.status, ToolStatus::Success);
        assert_eq!(executor.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_execute() {
        let executor = Arc::new(DryRunCommandExecutor::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = tool(executor.clone(), Arc::new(AutoApprove), MutationLedger::new(), "VALID")
            .invoke(
                json!({"key": "workbench.action.togglePanel"}),
                &TurnContext::new("r", cancel),
            )
            .await;
        assert_eq!(result.status, ToolStatus::Cancelled);
        assert!(executor.executed().is_empty());
    }
}
