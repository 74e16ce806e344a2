// src/tracker/state.rs

//! TOML persistence for tracker state across process runs.
//!
//! Stamps are process-local and never persisted; a restored status restarts
//! at pre-history. `Reverted` persists as `Synchronized` (both mean "nothing
//! pending"), and a broken project comes back broken so the failure is not
//! silently forgotten.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::status::StatusKind;
use crate::types::{AutoReloadType, ModificationType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistedStatusKind {
    Synchronized,
    Modified,
    Dirty,
    Broken,
}

impl From<StatusKind> for PersistedStatusKind {
    fn from(kind: StatusKind) -> Self {
        match kind {
            StatusKind::Synchronized | StatusKind::Reverted => {
                PersistedStatusKind::Synchronized
            }
            StatusKind::Modified => PersistedStatusKind::Modified,
            StatusKind::Dirty => PersistedStatusKind::Dirty,
            StatusKind::Broken => PersistedStatusKind::Broken,
        }
    }
}

impl From<PersistedStatusKind> for StatusKind {
    fn from(kind: PersistedStatusKind) -> Self {
        match kind {
            PersistedStatusKind::Synchronized => StatusKind::Synchronized,
            PersistedStatusKind::Modified => StatusKind::Modified,
            PersistedStatusKind::Dirty => StatusKind::Dirty,
            PersistedStatusKind::Broken => StatusKind::Broken,
        }
    }
}

/// One project's persisted status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProjectState {
    pub system_id: String,
    pub root_path: std::path::PathBuf,
    pub status: PersistedStatusKind,
    /// Pending modification type, meaningful for `modified`/`dirty`.
    #[serde(default = "unknown_modification")]
    pub modification: ModificationType,
}

fn unknown_modification() -> ModificationType {
    ModificationType::Unknown
}

/// Whole-tracker snapshot written between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerStateSnapshot {
    #[serde(default)]
    pub auto_reload_type: AutoReloadType,
    #[serde(default, rename = "project")]
    pub projects: Vec<PersistedProjectState>,
}

/// Read a snapshot from a TOML state file.
pub fn load_state(path: &Path) -> Result<TrackerStateSnapshot> {
    let raw = std::fs::read_to_string(path)?;
    let snapshot = toml::from_str(&raw)?;
    debug!(path = %path.display(), "tracker state loaded");
    Ok(snapshot)
}

/// Write a snapshot to a TOML state file.
pub fn save_state(path: &Path, snapshot: &TrackerStateSnapshot) -> Result<()> {
    let raw = toml::to_string_pretty(snapshot)?;
    std::fs::write(path, raw)?;
    debug!(path = %path.display(), "tracker state saved");
    Ok(())
}
