use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use tracing::warn;

use super::{ConfirmationGate, ConfirmationRequest};

/// Approves everything (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl ConfirmationGate for AutoApprove {
    async fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        true
    }
}

/// Declines everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysDecline;

#[async_trait]
impl ConfirmationGate for AlwaysDecline {
    async fn confirm(&self, _request: &ConfirmationRequest) -> bool {
        false
    }
}

/// Interactive y/N prompt on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmationGate;

fn render_prompt(request: &ConfirmationRequest) -> String {
    let mut out = format!("\n{}\n{}\n", request.title.bold(), request.message);
    for item in &request.items {
        out.push_str(&format!(
            "  {} = {}\n    {}\n",
            item.key.cyan(),
            item.value,
            item.description.dimmed()
        ));
    }
    out.push_str("Proceed? [y/N] ");
    out
}

#[async_trait]
impl ConfirmationGate for StdinConfirmationGate {
    async fn confirm(&self, request: &ConfirmationRequest) -> bool {
        let prompt = render_prompt(request);
        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "{}", prompt);
            let _ = stderr.flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to read confirmation");
                false
            }
            Err(e) => {
                warn!(error = %e, "confirmation prompt task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ConfirmationItem;
    use serde_json::json;

    fn request() -> ConfirmationRequest {
        ConfirmationRequest {
            title: "Update restricted settings".into(),
            message: "The assistant wants to change:".into(),
            items: vec![ConfirmationItem {
                key: "security.workspace.trust.enabled".into(),
                value: json!(false),
                description: "Workspace trust.".into(),
            }],
        }
    }

    #[tokio::test]
    async fn test_fixed_gates() {
        assert!(AutoApprove.confirm(&request()).await);
        assert!(!AlwaysDecline.confirm(&request()).await);
    }

    #[test]
    fn test_prompt_lists_items() {
        colored::control::set_override(false);
        let prompt = render_prompt(&request());
        assert!(prompt.contains("security.workspace.trust.enabled = false"));
        assert!(prompt.ends_with("Proceed? [y/N] "));
    }
}
