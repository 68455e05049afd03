use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use quicktransfer_core::outcome::TransferOutcome;
use serde::{Deserialize, Serialize};

/// One transfer attempt as the agent saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHistoryEntry {
    pub ts_unix_ms: i64,
    pub label: String,
    pub destination: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransferHistoryEntry {
    pub fn from_outcome(label: &str, destination: &str, outcome: &TransferOutcome) -> Self {
        let reason = match outcome {
            TransferOutcome::FailedHostRejected(reason) => Some(reason.clone()),
            _ => None,
        };
        Self {
            ts_unix_ms: chrono::Utc::now().timestamp_millis(),
            label: label.to_string(),
            destination: destination.to_string(),
            outcome: outcome.label().to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferHistoryStore {
    path: PathBuf,
    max_entries: usize,
}

impl TransferHistoryStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_entries: 200,
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    pub fn load(&self) -> anyhow::Result<Vec<TransferHistoryEntry>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read history: {}", self.path.display()))?;
        let entries: Vec<TransferHistoryEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse history: {}", self.path.display()))?;
        Ok(entries)
    }

    pub fn append(&self, entry: TransferHistoryEntry) -> anyhow::Result<()> {
        let mut entries = self.load()?;
        entries.push(entry);
        if entries.len() > self.max_entries {
            let start = entries.len() - self.max_entries;
            entries = entries.split_off(start);
        }

        let json = serde_json::to_string_pretty(&entries)?;
        crate::fs::write_atomic(&self.path, json.as_bytes())
            .with_context(|| format!("failed to replace history: {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove history: {}", self.path.display()))?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
