//! Chat handler: one assistant turn against the configured model.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatRequest, StopReason};
use crate::cli::output::{output_json, print_error, print_hint, print_success, OutputMode};
use crate::host::{
    AutoApprove, BufferedSink, ConfirmationGate, ConfirmationItem, ConfirmationRequest,
    ResponseSink, StdinConfirmationGate, StdoutSink,
};
use crate::init::AppContext;
use crate::llm::OpenAiCompatibleModel;
use crate::session::{apply_undo, UndoAction};

const LAST_UNDO_FILE: &str = "last-undo.json";

#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub auto_approve: bool,
    pub offer_undo: bool,
    pub fresh: bool,
}

fn last_undo_path(ctx: &AppContext) -> PathBuf {
    ctx.data_path.join(LAST_UNDO_FILE)
}

pub async fn handle_chat(
    ctx: &AppContext,
    request: &str,
    options: ChatOptions,
    mode: OutputMode,
) -> Result<()> {
    if ctx.config.model.api_key().is_none() {
        print_hint(&format!(
            "No API key found in CONFPILOT_API_KEY or {}; sending the request without one.",
            ctx.config.model.api_key_env
        ));
    }
    if options.fresh {
        ctx.transcript.clear().await?;
    }

    let model = Arc::new(OpenAiCompatibleModel::new(&ctx.config.model)?);
    let gate: Arc<dyn ConfirmationGate> = if options.auto_approve {
        Arc::new(AutoApprove)
    } else {
        Arc::new(StdinConfirmationGate)
    };
    let orchestrator = ctx.orchestrator(model, gate.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let history = ctx.transcript.load().await;
    let chat_request = ChatRequest::new(request).with_history(history);

    let stdout_sink = StdoutSink::new();
    let buffered_sink = BufferedSink::new();
    let sink: &dyn ResponseSink = match mode {
        OutputMode::Human => &stdout_sink,
        OutputMode::Json => &buffered_sink,
    };

    let result = orchestrator.run_turn(chat_request, sink, cancel).await?;
    ctx.transcript
        .append(result.record(request), ctx.config.history_turns)
        .await?;

    match &result.undo {
        Some(action) => {
            tokio::fs::create_dir_all(&ctx.data_path).await?;
            tokio::fs::write(last_undo_path(ctx), serde_json::to_string_pretty(action)?).await?;
        }
        None => {
            let _ = tokio::fs::remove_file(last_undo_path(ctx)).await;
        }
    }

    let executed = ctx.executor.executed();
    if mode == OutputMode::Json {
        output_json(&json!({
            "response": buffered_sink.markdown_text(),
            "text": result.text,
            "rounds": result.rounds(),
            "stopped": format!("{:?}", result.stop).to_lowercase(),
            "metadata": result.metadata,
            "undo": result.undo,
            "commands": executed
                .iter()
                .map(|c| json!({ "command": c.command, "args": c.args }))
                .collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    println!();
    match result.stop {
        StopReason::Converged => {}
        StopReason::RoundLimit => print_hint("(stopped after reaching the round limit)"),
        StopReason::Cancelled => print_hint("(cancelled)"),
    }
    for command in &executed {
        print_hint(&format!(
            "dry run: {} {}",
            command.command,
            serde_json::to_string(&command.args)?
        ));
    }

    if let Some(action) = stdout_sink.take_undo() {
        if options.offer_undo && !options.auto_approve {
            offer_undo(ctx, &action, gate.as_ref()).await?;
        } else {
            print_hint(&format!("{}: run `confpilot undo`", action.label()));
        }
    }
    Ok(())
}

async fn offer_undo(ctx: &AppContext, action: &UndoAction, gate: &dyn ConfirmationGate) -> Result<()> {
    let request = ConfirmationRequest {
        title: action.label(),
        message: "Restore the previous values?".into(),
        items: action
            .changes
            .iter()
            .map(|c| ConfirmationItem {
                key: c.key.clone(),
                value: c.old_value.clone(),
                description: format!("currently {}", c.new_value),
            })
            .collect(),
    };
    if gate.confirm(&request).await {
        restore(ctx, action, OutputMode::Human).await?;
    }
    Ok(())
}

async fn restore(ctx: &AppContext, action: &UndoAction, mode: OutputMode) -> Result<()> {
    let report = apply_undo(ctx.store.as_ref(), action).await;
    let _ = tokio::fs::remove_file(last_undo_path(ctx)).await;

    if mode == OutputMode::Json {
        output_json(&report);
        return Ok(());
    }
    for key in &report.restored {
        print_success(&format!("restored {}", key.cyan()));
    }
    for (key, reason) in &report.failed {
        print_error(&format!("could not restore {}: {}", key, reason));
    }
    Ok(())
}

/// Undo the settings changed by the last chat turn.
pub async fn handle_undo(ctx: &AppContext, mode: OutputMode) -> Result<()> {
    let path = last_undo_path(ctx);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            print_hint("Nothing to undo.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let action: UndoAction = serde_json::from_str(&text)?;
    restore(ctx, &action, mode).await
}
