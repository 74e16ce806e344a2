// src/tracker/mod.rs

//! The coordinator: ties settings bookkeeping, status and scheduling
//! together for every registered project.
//!
//! [`ProjectTracker`] is the single entry point the hosting application
//! talks to. It owns one [`ProjectEntry`](entry::ProjectEntry) per
//! registered collaborator, fans raw file events out to the projects whose
//! settings set contains the path, and decides per the auto-reload policy
//! whether a pending change schedules a reload or only raises the
//! notification.
//!
//! All awaits happen outside of `std::sync` guards; entries are snapshotted
//! out of the registry lock before any async work.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::errors::{ReloadTrackError, Result};
use crate::project::{ProjectAware, ProjectAwareListener, ProjectId};
use crate::scheduler::{ReloadDispatcher, ReloadExecutor, SchedulerTuning};
use crate::settings::{Classification, FileEventContext, ModificationClassifier};
use crate::stamp::StampSource;
use crate::status::{ProjectStatus, StatusKind};
use crate::types::{
    AutoReloadType, FileEventKind, ModificationType, ReloadCollisionPolicy, ReloadStatus,
};

mod entry;
mod notification;
pub mod state;

use entry::ProjectEntry;
pub use notification::NotificationAggregator;
pub use state::{PersistedProjectState, PersistedStatusKind, TrackerStateSnapshot};

/// Construction-time knobs. Everything here can also be changed at runtime
/// through the corresponding setter.
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// When false, reloads execute inline inside the call that triggered
    /// them instead of going through the per-project dispatch loop. Meant
    /// for deterministic tests.
    pub async_execution: bool,
    pub merging_span: Duration,
    pub max_merge_delay: Duration,
    pub collision_policy: ReloadCollisionPolicy,
    pub auto_reload_type: AutoReloadType,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        let tuning = SchedulerTuning::default();
        Self {
            async_execution: true,
            merging_span: tuning.merging_span,
            max_merge_delay: tuning.max_merge_delay,
            collision_policy: tuning.collision_policy,
            auto_reload_type: AutoReloadType::default(),
        }
    }
}

/// Whether an event's content change survived or was undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeNature {
    /// The file differs from its last synchronized content.
    Changed,
    /// The file returned to its last synchronized content. Content diffing
    /// is the watcher's concern; the tracker only consumes the verdict.
    Reverted,
}

/// One raw settings-area file event, as delivered by the hosting
/// application's file watcher.
#[derive(Debug, Clone)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
    pub modification: ModificationType,
    pub nature: ChangeNature,
}

impl FileEvent {
    pub fn new(
        path: impl Into<PathBuf>,
        kind: FileEventKind,
        modification: ModificationType,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            modification,
            nature: ChangeNature::Changed,
        }
    }

    pub fn reverted(path: impl Into<PathBuf>, modification: ModificationType) -> Self {
        Self {
            path: path.into(),
            kind: FileEventKind::Update,
            modification,
            nature: ChangeNature::Reverted,
        }
    }
}

pub(crate) struct TrackerShared {
    stamps: StampSource,
    projects: RwLock<HashMap<ProjectId, Arc<ProjectEntry>>>,
    tuning: Mutex<SchedulerTuning>,
    auto_reload_type: Mutex<AutoReloadType>,
    async_execution: AtomicBool,
    classifier: RwLock<ModificationClassifier>,
    notifications: NotificationAggregator,
    /// Persisted status for projects that have not re-registered yet this
    /// run. Consumed on registration.
    restored: Mutex<HashMap<ProjectId, PersistedProjectState>>,
}

/// Coordinates auto-reload for every registered build-system project.
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct ProjectTracker {
    shared: Arc<TrackerShared>,
}

impl ProjectTracker {
    pub fn new() -> Self {
        Self::with_options(TrackerOptions::default())
    }

    pub fn with_options(options: TrackerOptions) -> Self {
        Self {
            shared: Arc::new(TrackerShared {
                stamps: StampSource::new(),
                projects: RwLock::new(HashMap::new()),
                tuning: Mutex::new(SchedulerTuning {
                    merging_span: options.merging_span,
                    max_merge_delay: options.max_merge_delay,
                    collision_policy: options.collision_policy,
                }),
                auto_reload_type: Mutex::new(options.auto_reload_type),
                async_execution: AtomicBool::new(options.async_execution),
                classifier: RwLock::new(ModificationClassifier::new()),
                notifications: NotificationAggregator::new(),
                restored: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register and activate a project.
    pub async fn register(&self, aware: Arc<dyn ProjectAware>) -> Result<()> {
        self.register_with(aware, true).await
    }

    /// Register a project, optionally leaving it inactive. Inactive projects
    /// accumulate status and notifications but never auto-reload until
    /// [`ProjectTracker::activate`] (or an explicit reload) flips them.
    pub async fn register_with(
        &self,
        aware: Arc<dyn ProjectAware>,
        activate: bool,
    ) -> Result<()> {
        let id = aware.project_id();
        if self.shared.is_registered(&id) {
            return Err(ReloadTrackError::DuplicateProject(id));
        }
        let restored = self.shared.restored.lock().expect("restored map poisoned").remove(&id);

        let status = match &restored {
            Some(persisted) => {
                ProjectStatus::restored(persisted.status.into(), persisted.modification)
            }
            None => ProjectStatus::new(),
        };

        let entry = Arc::new(ProjectEntry::new(id.clone(), aware, status, activate));
        if restored.is_none() {
            // Never imported before: everything about the project is
            // pending, with no concrete paths to attribute it to.
            entry.journal().mark_undefined();
            entry.status.mark_dirty(self.shared.stamps.next(), ModificationType::Unknown);
        }

        {
            let mut projects = self.shared.projects.write().expect("project map poisoned");
            if projects.contains_key(&id) {
                // Raced with another registration of the same descriptor.
                return Err(ReloadTrackError::DuplicateProject(id));
            }
            projects.insert(id.clone(), Arc::clone(&entry));
        }

        let listener = Arc::new(TrackerListener {
            shared: Arc::downgrade(&self.shared),
            id: id.clone(),
        });
        *entry.subscription.lock().expect("subscription slot poisoned") =
            Some(entry.aware.subscribe(listener));

        let executor = Arc::new(ProjectReloadExecutor {
            shared: Arc::downgrade(&self.shared),
            id: id.clone(),
        });
        *entry.dispatcher.lock().expect("dispatcher slot poisoned") =
            Some(ReloadDispatcher::spawn(executor));

        info!(project = %id, activate, restored = restored.is_some(), "project registered");
        self.shared.refresh_notification(&entry);

        if activate && !entry.status.is_up_to_date() {
            // The registration pass is gated only by the global kill switch;
            // restored pending changes get resynced without waiting for a
            // fresh event.
            if self.auto_reload_type() != AutoReloadType::None {
                self.shared.request_reload(&entry, false).await;
            }
        }
        Ok(())
    }

    /// Drop a project. An in-flight reload for it finishes but its outcome
    /// is discarded.
    pub fn unregister(&self, id: &ProjectId) -> Result<()> {
        let entry = {
            let mut projects = self.shared.projects.write().expect("project map poisoned");
            projects
                .remove(id)
                .ok_or_else(|| ReloadTrackError::UnknownProject(id.clone()))?
        };
        if let Some(subscription) = entry.subscription.lock().expect("subscription slot poisoned").take() {
            subscription.unsubscribe();
        }
        // Dropping the dispatcher closes its channel and winds the loop down.
        entry.dispatcher.lock().expect("dispatcher slot poisoned").take();
        self.shared.notifications.remove(id);
        info!(project = %id, "project unregistered");
        Ok(())
    }

    /// Activate a previously registered-but-inactive project, scheduling a
    /// reload if it has pending changes.
    pub async fn activate(&self, id: &ProjectId) -> Result<()> {
        let entry = self.shared.entry(id)?;
        entry.set_active();
        debug!(project = %id, "project activated");
        if !entry.status.is_up_to_date() && self.auto_reload_type() != AutoReloadType::None {
            self.shared.request_reload(&entry, false).await;
        }
        Ok(())
    }

    pub fn active_projects(&self) -> BTreeSet<ProjectId> {
        self.shared
            .projects
            .read()
            .expect("project map poisoned")
            .values()
            .filter(|e| e.is_active())
            .map(|e| e.id.clone())
            .collect()
    }

    /// Feed one raw file event through classification, journaling, status
    /// and (policy permitting) reload scheduling.
    pub async fn handle_file_event(&self, event: FileEvent) {
        let entries = self.shared.snapshot_entries();

        // A created file may belong to a settings set the cached scan could
        // not have contained, so creations invalidate every cache before any
        // membership check. Deletions are the opposite: membership must be
        // decided against the set the file was still part of.
        if event.kind == FileEventKind::Create {
            for entry in &entries {
                entry.registry().invalidate();
            }
        }

        for entry in &entries {
            let member = entry.registry().contains(entry.aware.as_ref(), &event.path);
            if event.kind == FileEventKind::Delete {
                entry.registry().invalidate();
            }
            if !member {
                continue;
            }

            match event.nature {
                ChangeNature::Reverted => {
                    let emptied = {
                        let mut journal = entry.journal();
                        journal.remove(&event.path);
                        journal.is_empty()
                    };
                    if emptied {
                        entry.status.mark_reverted(self.shared.stamps.next());
                    }
                    trace!(project = %entry.id, path = %event.path.display(), "change reverted");
                    self.shared.refresh_notification(entry);
                }
                ChangeNature::Changed => {
                    let classification = {
                        let classifier =
                            self.shared.classifier.read().expect("classifier poisoned");
                        classifier.classify(&FileEventContext {
                            path: &event.path,
                            kind: event.kind,
                            modification: event.modification,
                            reload: entry.reload_progress(),
                        })
                    };
                    let ty = match classification {
                        Classification::Track(ty) => ty,
                        Classification::Ignored => continue,
                    };

                    // Drawn only now, after the membership scan: a reload
                    // that started while the scan ran carries an older
                    // stamp, so this modification survives its
                    // synchronization.
                    let stamp = self.shared.stamps.next();
                    entry.journal().record(&event.path, event.kind);
                    entry.status.mark_modified(stamp, ty);
                    self.shared.refresh_notification(entry);
                    debug!(
                        project = %entry.id,
                        path = %event.path.display(),
                        kind = ?event.kind,
                        ty = ?ty,
                        "settings file changed"
                    );

                    let merged = entry.status.modification_type();
                    if entry.is_active()
                        && auto_reload_permitted(self.auto_reload_type(), merged)
                    {
                        self.shared.request_reload(entry, false).await;
                    }
                }
            }
        }
    }

    /// Mark a project as needing a full resync for reasons outside any
    /// concrete settings file. Raises the notification; never auto-reloads.
    pub fn mark_dirty(&self, id: &ProjectId) -> Result<()> {
        let entry = self.shared.entry(id)?;
        entry.journal().mark_undefined();
        entry
            .status
            .mark_dirty(self.shared.stamps.next(), ModificationType::Unknown);
        self.shared.refresh_notification(&entry);
        Ok(())
    }

    /// Explicitly reload one project if it has pending changes.
    pub async fn schedule_reload(&self, id: &ProjectId) -> Result<()> {
        let entry = self.shared.entry(id)?;
        entry.set_active();
        if !entry.status.is_up_to_date() {
            self.shared.request_reload(&entry, true).await;
        }
        Ok(())
    }

    /// Explicitly reload one project regardless of pending state.
    pub async fn force_reload(&self, id: &ProjectId) -> Result<()> {
        let entry = self.shared.entry(id)?;
        entry.set_active();
        self.shared.request_reload(&entry, true).await;
        Ok(())
    }

    /// Explicitly reload every project with pending changes. The big
    /// "reload all" button: it also activates every registered project,
    /// since the user asked for all of them.
    pub async fn schedule_project_reload(&self) {
        for entry in self.shared.snapshot_entries() {
            entry.set_active();
            if !entry.status.is_up_to_date() {
                self.shared.request_reload(&entry, true).await;
            }
        }
    }

    pub fn auto_reload_type(&self) -> AutoReloadType {
        *self.shared.auto_reload_type.lock().expect("auto reload type poisoned")
    }

    /// Change the global policy. Loosening the policy immediately reconciles:
    /// projects whose pending change is now auto-reloadable get scheduled.
    pub async fn set_auto_reload_type(&self, ty: AutoReloadType) {
        {
            let mut current =
                self.shared.auto_reload_type.lock().expect("auto reload type poisoned");
            if *current == ty {
                return;
            }
            *current = ty;
        }
        info!(auto_reload_type = ?ty, "auto-reload policy changed");

        for entry in self.shared.snapshot_entries() {
            if entry.is_active()
                && !entry.status.is_up_to_date()
                && auto_reload_permitted(ty, entry.status.modification_type())
            {
                self.shared.request_reload(&entry, false).await;
            }
        }
    }

    /// Install a glob-based ignore rule for file events.
    pub fn add_ignore_rule(
        &self,
        pattern: &str,
        when: impl Fn(&FileEventContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Result<()> {
        let mut classifier = self.shared.classifier.write().expect("classifier poisoned");
        classifier.add_ignore_rule(pattern, when)?;
        Ok(())
    }

    /// Install a modification-type adjustment rule.
    pub fn add_adjustment_rule(
        &self,
        rule: impl Fn(&Path, ModificationType) -> ModificationType + Send + Sync + 'static,
    ) {
        let mut classifier = self.shared.classifier.write().expect("classifier poisoned");
        classifier.add_adjustment_rule(rule);
    }

    pub fn set_merging_span(&self, span: Duration) {
        self.shared.tuning.lock().expect("tuning poisoned").merging_span = span;
    }

    pub fn set_max_merge_delay(&self, delay: Duration) {
        self.shared.tuning.lock().expect("tuning poisoned").max_merge_delay = delay;
    }

    pub fn set_collision_policy(&self, policy: ReloadCollisionPolicy) {
        self.shared.tuning.lock().expect("tuning poisoned").collision_policy = policy;
    }

    pub fn set_async_execution(&self, enabled: bool) {
        self.shared.async_execution.store(enabled, Ordering::SeqCst);
    }

    /// Projects that should currently surface the reload notification.
    pub fn projects_needing_notification(&self) -> BTreeSet<ProjectId> {
        self.shared.notifications.projects_needing_notification()
    }

    pub fn status_kind(&self, id: &ProjectId) -> Result<StatusKind> {
        Ok(self.shared.entry(id)?.status.kind())
    }

    pub fn is_up_to_date(&self, id: &ProjectId) -> Result<bool> {
        Ok(self.shared.entry(id)?.status.is_up_to_date())
    }

    /// How many settings-set re-scans the tracker has asked the project's
    /// collaborator for.
    pub fn settings_access_count(&self, id: &ProjectId) -> Result<u64> {
        Ok(self.shared.entry(id)?.registry().access_count())
    }

    /// Snapshot all per-project status for persistence between runs.
    pub fn state_snapshot(&self) -> TrackerStateSnapshot {
        let mut projects: Vec<PersistedProjectState> = self
            .shared
            .snapshot_entries()
            .iter()
            .map(|entry| PersistedProjectState {
                system_id: entry.id.system_id.clone(),
                root_path: entry.id.root_path.clone(),
                status: entry.status.kind().into(),
                modification: entry.status.modification_type(),
            })
            .collect();
        projects.sort_by(|a, b| {
            (&a.system_id, &a.root_path).cmp(&(&b.system_id, &b.root_path))
        });
        TrackerStateSnapshot {
            auto_reload_type: self.auto_reload_type(),
            projects,
        }
    }

    /// Seed restored status for projects that will register later this run.
    pub fn restore_state(&self, snapshot: TrackerStateSnapshot) {
        *self.shared.auto_reload_type.lock().expect("auto reload type poisoned") =
            snapshot.auto_reload_type;
        let mut restored = self.shared.restored.lock().expect("restored map poisoned");
        for project in snapshot.projects {
            let id = ProjectId::new(project.system_id.clone(), project.root_path.clone());
            restored.insert(id, project);
        }
    }

    /// Save the current snapshot to a TOML state file.
    pub fn save_state_to(&self, path: &Path) -> Result<()> {
        state::save_state(path, &self.state_snapshot())
    }

    /// Load and apply a TOML state file written by a previous run.
    pub fn restore_state_from(&self, path: &Path) -> Result<()> {
        self.restore_state(state::load_state(path)?);
        Ok(())
    }
}

impl Default for ProjectTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProjectTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectTracker")
            .field("auto_reload_type", &self.auto_reload_type())
            .finish_non_exhaustive()
    }
}

/// Auto-reload gate for an implicit (non-explicit) reload request.
fn auto_reload_permitted(policy: AutoReloadType, ty: ModificationType) -> bool {
    match policy {
        AutoReloadType::All => matches!(
            ty,
            ModificationType::Internal | ModificationType::External
        ),
        AutoReloadType::Selective => ty == ModificationType::External,
        AutoReloadType::None => false,
    }
}

impl TrackerShared {
    fn entry(&self, id: &ProjectId) -> Result<Arc<ProjectEntry>> {
        self.projects
            .read()
            .expect("project map poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| ReloadTrackError::UnknownProject(id.clone()))
    }

    fn is_registered(&self, id: &ProjectId) -> bool {
        self.projects.read().expect("project map poisoned").contains_key(id)
    }

    fn snapshot_entries(&self) -> Vec<Arc<ProjectEntry>> {
        self.projects
            .read()
            .expect("project map poisoned")
            .values()
            .cloned()
            .collect()
    }

    fn current_tuning(&self) -> SchedulerTuning {
        *self.tuning.lock().expect("tuning poisoned")
    }

    fn refresh_notification(&self, entry: &ProjectEntry) {
        let needs = !entry.status.is_up_to_date()
            && entry.status.modification_type() != ModificationType::Hidden;
        self.notifications.update(&entry.id, needs);
    }

    async fn request_reload(self: &Arc<Self>, entry: &Arc<ProjectEntry>, explicit: bool) {
        if self.async_execution.load(Ordering::SeqCst) {
            let dispatcher = entry.dispatcher.lock().expect("dispatcher slot poisoned");
            if let Some(dispatcher) = dispatcher.as_ref() {
                dispatcher.request(explicit);
            }
        } else {
            TrackerShared::execute_reload(self, &entry.id, explicit).await;
        }
    }

    /// Run one reload end to end: drain the journal, call the collaborator,
    /// fold the outcome back into the status.
    async fn execute_reload(self: &Arc<Self>, id: &ProjectId, explicit: bool) {
        let Ok(entry) = self.entry(id) else {
            trace!(project = %id, "reload for unregistered project skipped");
            return;
        };

        let tuning = self.current_tuning();
        let _guard = if tuning.collision_policy == ReloadCollisionPolicy::Duplicate {
            None
        } else {
            Some(Arc::clone(&entry.exec_lock).lock_owned().await)
        };

        let start = self.stamps.next();
        entry.reload_started();
        let context = entry.take_reload_context(explicit);
        debug!(project = %id, explicit, ?context, "reload starting");

        let aware = Arc::clone(&entry.aware);
        let task_context = context.clone();
        let outcome =
            tokio::spawn(async move { aware.reload_project(task_context).await }).await;
        entry.reload_finished();

        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(error)) => {
                warn!(project = %id, %error, "reload failed");
                ReloadStatus::Failure
            }
            Err(join_error) => {
                warn!(project = %id, %join_error, "reload panicked");
                ReloadStatus::Failure
            }
        };

        if !self.is_registered(id) {
            debug!(project = %id, "project unregistered mid-reload; outcome discarded");
            return;
        }

        match status {
            ReloadStatus::Success => {
                // Stamped at the start: changes observed while the reload
                // ran stay pending.
                entry.status.mark_synchronized(start);
                // Events can land in the journal between the snapshot and
                // the synchronization with a stamp the guard above already
                // absorbed. Anything still journaled must read as pending.
                if !entry.journal().is_empty() && entry.status.is_up_to_date() {
                    entry
                        .status
                        .mark_modified(self.stamps.next(), ModificationType::Unknown);
                }
                info!(project = %id, "reload succeeded");
            }
            ReloadStatus::Failure => {
                entry.restore_reload_context(context);
                entry.status.mark_broken(self.stamps.next());
                info!(project = %id, "reload failed; changes kept pending");
            }
        }
        self.refresh_notification(&entry);
    }

    /// Re-diff the settings set after the collaborator announced it changed.
    async fn handle_settings_files_list_change(self: &Arc<Self>, id: &ProjectId) {
        let Ok(entry) = self.entry(id) else { return };

        let (created, deleted) = {
            let mut registry = entry.registry();
            let old = registry.files(entry.aware.as_ref()).clone();
            registry.invalidate();
            let new = registry.files(entry.aware.as_ref()).clone();
            let created: Vec<PathBuf> = new.difference(&old).cloned().collect();
            let deleted: Vec<PathBuf> = old.difference(&new).cloned().collect();
            (created, deleted)
        };
        if created.is_empty() && deleted.is_empty() {
            return;
        }

        let stamp = self.stamps.next();
        {
            let mut journal = entry.journal();
            for path in &created {
                journal.record(path, FileEventKind::Create);
            }
            for path in &deleted {
                journal.record(path, FileEventKind::Delete);
            }
        }
        // Additions and removals of whole settings files come from outside
        // the open editors, so the list diff counts as external.
        entry.status.mark_modified(stamp, ModificationType::External);
        self.refresh_notification(&entry);
        debug!(
            project = %id,
            created = created.len(),
            deleted = deleted.len(),
            "settings files list changed"
        );

        let policy = *self.auto_reload_type.lock().expect("auto reload type poisoned");
        if entry.is_active()
            && auto_reload_permitted(policy, entry.status.modification_type())
        {
            self.request_reload(&entry, false).await;
        }
    }
}

/// The tracker's own subscription to a collaborator's events.
struct TrackerListener {
    shared: Weak<TrackerShared>,
    id: ProjectId,
}

impl ProjectAwareListener for TrackerListener {
    fn on_settings_files_list_change(&self) {
        let Some(shared) = self.shared.upgrade() else { return };
        let id = self.id.clone();
        tokio::spawn(async move {
            shared.handle_settings_files_list_change(&id).await;
        });
    }
}

/// Executor handed to each project's dispatch loop. Holds the shared state
/// weakly so a dropped tracker winds the loops down.
struct ProjectReloadExecutor {
    shared: Weak<TrackerShared>,
    id: ProjectId,
}

impl ReloadExecutor for ProjectReloadExecutor {
    fn tuning(&self) -> SchedulerTuning {
        match self.shared.upgrade() {
            Some(shared) => shared.current_tuning(),
            None => SchedulerTuning::default(),
        }
    }

    fn execute(
        &self,
        explicit: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            if let Some(shared) = self.shared.upgrade() {
                shared.execute_reload(&self.id, explicit).await;
            }
        })
    }
}
