// src/tracker/entry.rs

//! Per-project bookkeeping owned by the tracker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::listener::Subscription;
use crate::project::{ProjectAware, ProjectId, ReloadContext};
use crate::scheduler::ReloadDispatcher;
use crate::settings::{ChangeJournal, SettingsRegistry};
use crate::status::ProjectStatus;
use crate::types::ReloadProgress;

/// Everything the tracker owns for one registered project. Created on
/// registration, dropped on unregistration; the scheduler only ever holds a
/// transient `Arc` while a reload is in flight.
pub(crate) struct ProjectEntry {
    pub id: ProjectId,
    pub aware: Arc<dyn ProjectAware>,
    pub status: ProjectStatus,
    registry: Mutex<SettingsRegistry>,
    journal: Mutex<ChangeJournal>,
    active: AtomicBool,
    /// Number of reloads currently executing (may exceed one under the
    /// Duplicate collision policy).
    in_flight: AtomicUsize,
    /// Serializes executions under Cancel/Ignore. Shared so an execution can
    /// hold it while the entry itself is dropped by unregistration.
    pub exec_lock: Arc<tokio::sync::Mutex<()>>,
    pub dispatcher: Mutex<Option<ReloadDispatcher>>,
    pub subscription: Mutex<Option<Subscription>>,
}

impl ProjectEntry {
    pub fn new(
        id: ProjectId,
        aware: Arc<dyn ProjectAware>,
        status: ProjectStatus,
        active: bool,
    ) -> Self {
        Self {
            id,
            aware,
            status,
            registry: Mutex::new(SettingsRegistry::new()),
            journal: Mutex::new(ChangeJournal::new()),
            active: AtomicBool::new(active),
            in_flight: AtomicUsize::new(0),
            exec_lock: Arc::new(tokio::sync::Mutex::new(())),
            dispatcher: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn registry(&self) -> MutexGuard<'_, SettingsRegistry> {
        self.registry.lock().expect("settings registry poisoned")
    }

    pub fn journal(&self) -> MutexGuard<'_, ChangeJournal> {
        self.journal.lock().expect("change journal poisoned")
    }

    pub fn reload_progress(&self) -> ReloadProgress {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            ReloadProgress::InProgress
        } else {
            ReloadProgress::NotStarted
        }
    }

    pub fn reload_started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn reload_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Drain the journal into the context handed to the collaborator.
    /// Computed at execution time, never at schedule time.
    pub fn take_reload_context(&self, explicit: bool) -> ReloadContext {
        let (settings_files, undefined) = self.journal().snapshot();
        ReloadContext {
            is_explicit: explicit,
            has_undefined_modifications: undefined,
            settings_files,
        }
    }

    /// Put a failed reload's context back so the next attempt covers it.
    pub fn restore_reload_context(&self, context: ReloadContext) {
        self.journal()
            .restore(context.settings_files, context.has_undefined_modifications);
    }
}

impl std::fmt::Debug for ProjectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectEntry")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
