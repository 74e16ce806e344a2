// src/types.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Origin of a settings-file change, used to gate auto-reload policy.
///
/// - `Internal`: change made through the hosting application's own editing
///   path (an open editor buffer, a refactoring, ...).
/// - `External`: change made outside the application (direct disk write,
///   VCS checkout, generator).
/// - `Hidden`: change that must never by itself trigger a reload, even under
///   the most permissive policy. Only produced by explicit adjustment rules.
/// - `Unknown`: origin could not be determined; treated conservatively
///   (notification yes, auto-reload no).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationType {
    Internal,
    External,
    Hidden,
    Unknown,
}

impl ModificationType {
    /// Conservativeness rank used when several pending changes of different
    /// types accumulate on one project. Higher rank wins a merge.
    ///
    /// `Unknown > Internal > External > Hidden`: an unknown change demands the
    /// most caution, an internal change requires user confirmation under
    /// `Selective`, an external change may auto-reload, and a hidden change
    /// never forces anything on its own.
    fn rank(self) -> u8 {
        match self {
            ModificationType::Unknown => 3,
            ModificationType::Internal => 2,
            ModificationType::External => 1,
            ModificationType::Hidden => 0,
        }
    }

    /// Merge two pending modification types; the more conservative survives.
    pub fn merge(self, other: ModificationType) -> ModificationType {
        if other.rank() > self.rank() { other } else { self }
    }
}

/// Global policy for reacting to settings-file modifications.
///
/// - `All`: any modification (internal or external) may auto-reload.
/// - `Selective`: only external modifications auto-reload; internal ones just
///   raise the notification (default behaviour).
/// - `None`: never auto-reload, notification only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoReloadType {
    All,
    Selective,
    None,
}

impl Default for AutoReloadType {
    fn default() -> Self {
        AutoReloadType::Selective
    }
}

impl FromStr for AutoReloadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(AutoReloadType::All),
            "selective" => Ok(AutoReloadType::Selective),
            "none" => Ok(AutoReloadType::None),
            other => Err(format!(
                "invalid auto_reload_type: {other} (expected \"all\", \"selective\" or \"none\")"
            )),
        }
    }
}

/// Behaviour when a reload is requested while one is already executing for
/// the same project.
///
/// - `Cancel`: the new request waits for the current execution to finish and
///   then runs exactly once more (default; no data loss, no overlap).
/// - `Ignore`: the new request is dropped; the in-flight reload snapshots the
///   settings state at execution time, so it already observes the change.
/// - `Duplicate`: run a second reload concurrently regardless. Exists to
///   validate that collaborators tolerate overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadCollisionPolicy {
    Duplicate,
    Cancel,
    Ignore,
}

impl Default for ReloadCollisionPolicy {
    fn default() -> Self {
        ReloadCollisionPolicy::Cancel
    }
}

impl FromStr for ReloadCollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duplicate" => Ok(ReloadCollisionPolicy::Duplicate),
            "cancel" => Ok(ReloadCollisionPolicy::Cancel),
            "ignore" => Ok(ReloadCollisionPolicy::Ignore),
            other => Err(format!(
                "invalid reload_collision_policy: {other} (expected \"duplicate\", \"cancel\" or \"ignore\")"
            )),
        }
    }
}

/// Outcome of a single reload execution, as reported by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    Success,
    Failure,
}

/// What happened to a path in a raw file-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    Create,
    Update,
    Delete,
}

/// Whether a reload is currently executing for the project a file event is
/// being classified against. Ignore/adjustment rules may key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadProgress {
    NotStarted,
    InProgress,
}
