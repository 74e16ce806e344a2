// src/project.rs

//! External collaborator interface.
//!
//! Each integrated build system implements [`ProjectAware`]: it owns the
//! actual import logic and the authoritative list of settings files, while
//! the tracker owns all sequencing. Under the default collision policy the
//! tracker calls [`ProjectAware::reload_project`] at most once concurrently
//! per project.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::listener::Subscription;
use crate::types::ReloadStatus;

/// Stable identity of a tracked project descriptor: which build system it
/// belongs to plus the root path it was imported from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId {
    pub system_id: String,
    pub root_path: PathBuf,
}

impl ProjectId {
    pub fn new(system_id: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            system_id: system_id.into(),
            root_path: root_path.into(),
        }
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system_id, self.root_path.display())
    }
}

/// Partition of the settings-file paths touched since the last reload
/// snapshot. The three sets are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsFilesContext {
    pub created: BTreeSet<PathBuf>,
    pub updated: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<PathBuf>,
}

impl SettingsFilesContext {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Snapshot handed to [`ProjectAware::reload_project`], computed at execution
/// time (never at schedule time).
#[derive(Debug, Clone, Default)]
pub struct ReloadContext {
    /// True when the reload was requested explicitly (user action), bypassing
    /// the auto-reload policy.
    pub is_explicit: bool,
    /// True when at least one change could not be attributed to a concrete
    /// settings file; the collaborator should resync everything.
    pub has_undefined_modifications: bool,
    /// Per-path partition of the changes this reload covers.
    pub settings_files: SettingsFilesContext,
}

/// Events the collaborator delivers to its subscribers.
///
/// The tracker subscribes on registration and drops its [`Subscription`] on
/// unregistration; collaborators must tolerate listeners disappearing at any
/// point.
pub trait ProjectAwareListener: Send + Sync {
    fn on_reload_start(&self) {}
    fn on_reload_finish(&self, _status: ReloadStatus) {}
    /// The set returned by [`ProjectAware::settings_files`] may have changed.
    fn on_settings_files_list_change(&self) {}
}

/// A project-like build descriptor integrated with the tracker.
pub trait ProjectAware: Send + Sync {
    fn project_id(&self) -> ProjectId;

    /// Current authoritative set of settings files. May perform a non-trivial
    /// re-scan; the tracker caches the result and rate-limits calls through
    /// [`crate::settings::SettingsRegistry`].
    fn settings_files(&self) -> BTreeSet<PathBuf>;

    /// Subscribe to reload lifecycle / settings-list events.
    fn subscribe(&self, listener: Arc<dyn ProjectAwareListener>) -> Subscription;

    /// Perform the actual re-import against the given snapshot.
    ///
    /// An `Err` is treated exactly like `Ok(ReloadStatus::Failure)`; it never
    /// crashes the tracker or blocks other projects.
    fn reload_project(
        &self,
        context: ReloadContext,
    ) -> Pin<Box<dyn Future<Output = Result<ReloadStatus>> + Send + '_>>;
}
