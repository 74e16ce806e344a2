// crates/test-utils/src/mock_project.rs

//! In-memory [`ProjectAware`] collaborator for tracker tests.
//!
//! Records every interaction the tracker performs (reload calls, listener
//! traffic, settings scans are counted by the tracker itself) and lets tests
//! script the next reload's behaviour: its outcome, a one-shot hook over the
//! received context, or a gate that holds the reload mid-flight so collision
//! policies can be exercised deterministically.

use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use reloadtrack::errors::Result;
use reloadtrack::listener::{ListenerSet, Subscription};
use reloadtrack::project::{
    ProjectAware, ProjectAwareListener, ProjectId, ReloadContext,
};
use reloadtrack::types::ReloadStatus;

type ReloadHook = Box<dyn FnOnce(&ReloadContext) + Send>;

pub struct MockProjectAware {
    id: ProjectId,
    settings: Mutex<BTreeSet<PathBuf>>,
    listeners: ListenerSet<dyn ProjectAwareListener>,
    reload_status: Mutex<ReloadStatus>,
    last_context: Mutex<Option<ReloadContext>>,
    hooks: Mutex<VecDeque<ReloadHook>>,

    reloads: AtomicUsize,
    reloads_begun: AtomicUsize,
    subscribes: AtomicUsize,
    // Shared with unsubscribe closures that may outlive borrows of the mock.
    unsubscribes: Arc<AtomicUsize>,

    /// While `gated` is set, each reload parks on the semaphore until a test
    /// hands it a permit.
    gated: AtomicBool,
    gate: Semaphore,
}

impl MockProjectAware {
    pub fn new(system_id: impl Into<String>, root_path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            id: ProjectId::new(system_id, root_path),
            settings: Mutex::new(BTreeSet::new()),
            listeners: ListenerSet::new(),
            reload_status: Mutex::new(ReloadStatus::Success),
            last_context: Mutex::new(None),
            hooks: Mutex::new(VecDeque::new()),
            reloads: AtomicUsize::new(0),
            reloads_begun: AtomicUsize::new(0),
            subscribes: AtomicUsize::new(0),
            unsubscribes: Arc::new(AtomicUsize::new(0)),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        })
    }

    pub fn id(&self) -> ProjectId {
        self.id.clone()
    }

    pub fn register_settings_file(&self, path: impl AsRef<Path>) {
        self.settings
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf());
    }

    pub fn remove_settings_file(&self, path: impl AsRef<Path>) {
        self.settings.lock().unwrap().remove(path.as_ref());
    }

    /// Announce to subscribers that the settings set changed.
    pub fn fire_settings_files_list_changed(&self) {
        self.listeners.notify(|l| l.on_settings_files_list_change());
    }

    pub fn set_reload_status(&self, status: ReloadStatus) {
        *self.reload_status.lock().unwrap() = status;
    }

    /// Run `hook` on the context of the next reload (one-shot, FIFO).
    pub fn on_next_reload(&self, hook: impl FnOnce(&ReloadContext) + Send + 'static) {
        self.hooks.lock().unwrap().push_back(Box::new(hook));
    }

    /// Make subsequent reloads park until [`MockProjectAware::release_reload`].
    pub fn pause_reloads(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let exactly one parked (or upcoming) reload proceed.
    pub fn release_reload(&self) {
        self.gate.add_permits(1);
    }

    /// Stop gating and release everything currently parked.
    pub fn resume_reloads(&self) {
        self.gated.store(false, Ordering::SeqCst);
        self.gate.add_permits(64);
    }

    /// Reloads that ran to completion.
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// Reloads that started, including ones currently parked on the gate.
    pub fn reload_begun_count(&self) -> usize {
        self.reloads_begun.load(Ordering::SeqCst)
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Context of the most recent reload, if any happened.
    pub fn last_context(&self) -> Option<ReloadContext> {
        self.last_context.lock().unwrap().clone()
    }
}

impl ProjectAware for MockProjectAware {
    fn project_id(&self) -> ProjectId {
        self.id.clone()
    }

    fn settings_files(&self) -> BTreeSet<PathBuf> {
        self.settings.lock().unwrap().clone()
    }

    fn subscribe(&self, listener: Arc<dyn ProjectAwareListener>) -> Subscription {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let inner = self.listeners.subscribe(listener);
        let unsubscribes = Arc::clone(&self.unsubscribes);
        // Compose so tests can observe the unsubscribe as well.
        Subscription::new(move || {
            unsubscribes.fetch_add(1, Ordering::SeqCst);
            inner.unsubscribe();
        })
    }

    fn reload_project(
        &self,
        context: ReloadContext,
    ) -> Pin<Box<dyn Future<Output = Result<ReloadStatus>> + Send + '_>> {
        Box::pin(async move {
            self.reloads_begun.fetch_add(1, Ordering::SeqCst);
            self.listeners.notify(|l| l.on_reload_start());

            if let Some(hook) = self.hooks.lock().unwrap().pop_front() {
                hook(&context);
            }
            if self.gated.load(Ordering::SeqCst) {
                let permit = self.gate.acquire().await.expect("gate closed");
                permit.forget();
            }

            *self.last_context.lock().unwrap() = Some(context);
            self.reloads.fetch_add(1, Ordering::SeqCst);

            let status = *self.reload_status.lock().unwrap();
            self.listeners.notify(|l| l.on_reload_finish(status));
            Ok(status)
        })
    }
}
