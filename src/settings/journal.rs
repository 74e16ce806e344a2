// src/settings/journal.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::project::SettingsFilesContext;
use crate::types::FileEventKind;

/// Accumulates per-path settings-file events between reload snapshots.
///
/// The journal is the per-project record of which settings files still
/// differ from their last-synchronized content. Consecutive events on the
/// same path collapse: delete-then-recreate reads as an update, and a file
/// created and deleted inside the same window cancels out. A revert removes
/// its path; a project with an empty journal has nothing pending.
#[derive(Debug, Default)]
pub struct ChangeJournal {
    entries: BTreeMap<PathBuf, FileEventKind>,
    undefined: bool,
}

impl ChangeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event for a settings path.
    pub fn record(&mut self, path: &Path, kind: FileEventKind) {
        use FileEventKind::*;

        let merged = match (self.entries.get(path).copied(), kind) {
            (None, k) => Some(k),
            // Created in this window, deleted again: net no change.
            (Some(Create), Delete) => None,
            (Some(Create), _) => Some(Create),
            // Existed at the last snapshot, deleted and recreated: the
            // content may differ, so this is an update, not delete+create.
            (Some(Delete), Create) => Some(Update),
            (Some(Delete), Update) => Some(Update),
            (Some(Delete), Delete) => Some(Delete),
            (Some(Update), Delete) => Some(Delete),
            (Some(Update), _) => Some(Update),
        };

        match merged {
            Some(kind) => {
                self.entries.insert(path.to_path_buf(), kind);
            }
            None => {
                self.entries.remove(path);
            }
        }
    }

    /// Drop a path whose content returned to its synchronized state.
    pub fn remove(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    /// Flag at least one change that could not be attributed to a concrete
    /// settings file. Cleared only by a snapshot.
    pub fn mark_undefined(&mut self) {
        self.undefined = true;
    }

    pub fn has_undefined_modifications(&self) -> bool {
        self.undefined
    }

    /// True when nothing is pending, neither concrete paths nor undefined
    /// modifications.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && !self.undefined
    }

    /// Drain the journal into a reload snapshot.
    ///
    /// Events observed after this call belong to the next reload.
    pub fn snapshot(&mut self) -> (SettingsFilesContext, bool) {
        let undefined = std::mem::take(&mut self.undefined);
        let entries = std::mem::take(&mut self.entries);

        let mut ctx = SettingsFilesContext::default();
        for (path, kind) in entries {
            match kind {
                FileEventKind::Create => ctx.created.insert(path),
                FileEventKind::Update => ctx.updated.insert(path),
                FileEventKind::Delete => ctx.deleted.insert(path),
            };
        }
        (ctx, undefined)
    }

    /// Merge a failed reload's snapshot back in, so its events feed the next
    /// attempt. Events recorded since the snapshot take precedence.
    pub fn restore(&mut self, ctx: SettingsFilesContext, undefined: bool) {
        self.undefined |= undefined;

        let older = ctx
            .created
            .into_iter()
            .map(|p| (p, FileEventKind::Create))
            .chain(ctx.updated.into_iter().map(|p| (p, FileEventKind::Update)))
            .chain(ctx.deleted.into_iter().map(|p| (p, FileEventKind::Delete)));

        let newer = std::mem::take(&mut self.entries);
        for (path, kind) in older {
            self.entries.insert(path, kind);
        }
        for (path, kind) in newer {
            self.record(&path, kind);
        }
    }
}
