// src/settings/registry.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::project::ProjectAware;

/// Per-project cache of the settings-file set.
///
/// Enumerating the set may require a non-trivial re-scan inside the
/// collaborator, so reads go through this cache and every actual re-scan is
/// counted. The cache is invalidated whenever any file is created or deleted
/// under the tracked roots, or when the project fires an explicit
/// settings-files-list-change event.
#[derive(Debug, Default)]
pub struct SettingsRegistry {
    cached: Option<BTreeSet<PathBuf>>,
    accesses: u64,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self {
            cached: None,
            accesses: 0,
        }
    }

    /// Current settings set, re-scanning through the collaborator on a cache
    /// miss.
    pub fn files(&mut self, aware: &dyn ProjectAware) -> &BTreeSet<PathBuf> {
        if self.cached.is_none() {
            debug!(project = %aware.project_id(), "settings cache miss; re-scanning");
            self.accesses += 1;
            self.cached = Some(aware.settings_files());
        }
        self.cached.as_ref().expect("cache populated above")
    }

    /// Membership query used by the classifier.
    pub fn contains(&mut self, aware: &dyn ProjectAware, path: &Path) -> bool {
        self.files(aware).contains(path)
    }

    /// Force a re-scan on the next read.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// How many actual re-scans this registry has performed.
    pub fn access_count(&self) -> u64 {
        self.accesses
    }
}
