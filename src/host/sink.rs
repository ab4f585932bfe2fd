use std::io::Write;
use std::sync::Mutex;

use super::ResponseSink;
use crate::session::UndoAction;

/// Collects everything rendered into memory.
#[derive(Debug, Default)]
pub struct BufferedSink {
    markdown: Mutex<String>,
    buttons: Mutex<Vec<UndoAction>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markdown_text(&self) -> String {
        self.markdown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn undo_buttons(&self) -> Vec<UndoAction> {
        self.buttons
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ResponseSink for BufferedSink {
    fn markdown(&self, text: &str) {
        self.markdown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_str(text);
    }

    fn undo_button(&self, action: &UndoAction) {
        self.buttons
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action.clone());
    }
}

/// Streams markdown straight to stdout; remembers the undo action for the CLI.
#[derive(Debug, Default)]
pub struct StdoutSink {
    undo: Mutex<Option<UndoAction>>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_undo(&self) -> Option<UndoAction> {
        self.undo.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl ResponseSink for StdoutSink {
    fn markdown(&self, text: &str) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn undo_button(&self, action: &UndoAction) {
        *self.undo.lock().unwrap_or_else(|e| e.into_inner()) = Some(action.clone());
    }
}
