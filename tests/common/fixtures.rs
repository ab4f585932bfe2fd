//! Sample schema documents and a scripted language model.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use confpilot::catalog::SchemaDocuments;
use confpilot::chat::{ResponsePart, ToolCall};
use confpilot::llm::{LanguageModel, ModelRequest, ResponseStream};
use confpilot::AssistantError;

pub const LIGHT_THEME: &str = "Light+ (default light)";

pub fn settings_schema() -> Value {
    json!({
        "properties": {
            "workbench.colorTheme": {
                "type": "string",
                "default": "Default Dark Modern",
                "markdownDescription": "Specifies the color theme used in the workbench.",
                "enum": ["Default Dark Modern", "Default Light Modern", LIGHT_THEME],
                "enumDescriptions": ["Dark theme", "Light theme", "Classic light theme"]
            },
            "editor.fontSize": {
                "type": "number",
                "default": 14,
                "description": "Controls the font size in pixels."
            },
            "editor.minimap.enabled": {
                "type": "boolean",
                "default": true,
                "description": "Controls whether the minimap is shown."
            },
            "files.autoSave": {
                "type": "string",
                "default": "off",
                "description": "Controls auto save of editors that have unsaved changes.",
                "enum": ["off", "afterDelay", "onFocusChange", "onWindowChange"]
            },
            "security.workspace.trust.enabled": {
                "type": "boolean",
                "default": true,
                "description": "Controls whether or not Workspace Trust is enabled.",
                "restricted": true
            },
            "[markdown]": {
                "type": "object",
                "description": "Language-specific overrides."
            }
        }
    })
}

pub fn keybindings_schema() -> Value {
    json!({
        "definitions": {
            "commandNames": {
                "enum": [
                    "workbench.action.togglePanel",
                    "workbench.action.toggleSidebarVisibility",
                    "workbench.action.resetViewLocations",
                    "vscode.setEditorLayout",
                    "editor.action.formatDocument",
                    "workbench.action.focusSideBar",
                    "workbench.action.undocumented"
                ],
                "enumDescriptions": [
                    "Toggle Panel Visibility",
                    "Toggle Primary Side Bar Visibility",
                    "Reset View Locations",
                    "Set Editor Layout",
                    "Format Document",
                    "Focus into Primary Side Bar",
                    ""
                ]
            },
            "commandsSchemas": {
                "allOf": [
                    {
                        "if": {"properties": {"command": {"const": "workbench.action.togglePanel"}}},
                        "then": {"properties": {"args": false}}
                    },
                    {
                        "if": {"properties": {"command": {"const": "vscode.setEditorLayout"}}},
                        "then": {"properties": {"args": {
                            "type": "object",
                            "required": ["orientation", "groups"],
                            "properties": {
                                "orientation": {"type": "number", "enum": [0, 1]},
                                "groups": {"type": "array"}
                            }
                        }}}
                    }
                ]
            }
        }
    })
}

pub fn default_keybindings() -> Value {
    json!([
        {"key": "ctrl+j", "command": "workbench.action.togglePanel"},
        {"key": "ctrl+b", "command": "workbench.action.toggleSidebarVisibility"},
        {"key": "ctrl+alt+b", "command": "-workbench.action.toggleSidebarVisibility"},
        {"key": "shift+alt+f", "command": "editor.action.formatDocument"}
    ])
}

pub fn sample_documents() -> SchemaDocuments {
    SchemaDocuments {
        settings_schema: settings_schema(),
        keybindings_schema: keybindings_schema(),
        default_keybindings: default_keybindings(),
    }
}

pub fn text(fragment: &str) -> ResponsePart {
    ResponsePart::Text(fragment.to_string())
}

pub fn call(id: &str, name: &str, arguments: Value) -> ResponsePart {
    ResponsePart::ToolCall(ToolCall {
        call_id: id.to_string(),
        name: name.to_string(),
        arguments,
    })
}

/// One scripted model reply.
pub enum Reply {
    Parts(Vec<ResponsePart>),
    /// The request itself fails.
    Fail(String),
    /// Cancel the turn's token before replying with these parts.
    CancelThen(Vec<ResponsePart>),
}

/// Replays scripted replies in order and records every request.
///
/// Once the script runs out it answers with plain text, so a loop that keeps
/// asking still converges.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn send(
        &self,
        request: ModelRequest,
        cancel: CancellationToken,
    ) -> Result<ResponseStream, AssistantError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Parts(vec![text("Done.")]));
        let parts = match reply {
            Reply::Parts(parts) => parts,
            Reply::Fail(message) => return Err(AssistantError::model(message)),
            Reply::CancelThen(parts) => {
                cancel.cancel();
                parts
            }
        };
        Ok(Box::pin(futures::stream::iter(
            parts.into_iter().map(Ok).collect::<Vec<_>>(),
        )))
    }
}
