//! On-disk transcript so consecutive CLI turns share history.

use std::path::{Path, PathBuf};
use tracing::warn;

use super::message::TurnRecord;
use crate::AssistantError;

/// JSON array of [`TurnRecord`]s, oldest first.
pub struct TranscriptFile {
    path: PathBuf,
}

impl TranscriptFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored turns. A missing or unreadable file is an empty history.
    pub async fn load(&self) -> Vec<TurnRecord> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "transcript unreadable");
                return Vec::new();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "transcript corrupt, starting fresh");
            Vec::new()
        })
    }

    /// Append `record`, keeping at most `keep` turns.
    pub async fn append(&self, record: TurnRecord, keep: usize) -> Result<(), AssistantError> {
        let mut turns = self.load().await;
        turns.push(record);
        let excess = turns.len().saturating_sub(keep.max(1));
        turns.drain(..excess);
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&turns)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), AssistantError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
