//! Pending Approval Store
//!
//! Keeps the open approval round of a tool on disk so a reviewer can answer
//! it from another process.
//!
//! # Storage Format
//!
//! ```text
//! <approvals dir>/
//! └── pending_approval.json
//! ```

use super::ApprovalBatch;
use crate::results::ResultsPayload;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PENDING_FILE: &str = "pending_approval.json";

/// An open approval round: the frozen batch and the results to show once
/// it is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub batch: ApprovalBatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred_results: Option<ResultsPayload>,
}

/// Persistent store for the pending round
pub struct PendingApprovalStore {
    dir: PathBuf,
}

impl PendingApprovalStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| {
            format!(
                "Failed to create approval store directory: {}",
                dir.display()
            )
        })?;
        Ok(Self { dir })
    }

    fn path(&self) -> PathBuf {
        self.dir.join(PENDING_FILE)
    }

    pub fn save(&self, pending: &PendingApproval) -> Result<()> {
        let path = self.path();
        let json = serde_json::to_string_pretty(pending)?;
        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Failed to write approval file: {}", path.display()))?;
        debug!(
            "Saved pending approval {} to {}",
            pending.batch.id,
            path.display()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Option<PendingApproval>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read approval file: {}", path.display()))?;
        let pending = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse approval file: {}", path.display()))?;
        Ok(Some(pending))
    }

    /// Remove the stored round. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        let path = self.path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete approval file: {}", path.display()))?;
        debug!("Cleared pending approval at {}", path.display());
        Ok(true)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Atomic write via temp file + rename
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
