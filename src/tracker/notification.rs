// src/tracker/notification.rs

use std::collections::BTreeSet;
use std::sync::Mutex;

use tracing::trace;

use crate::project::ProjectId;

/// Derived view of which projects should surface "reload available" UI
/// state.
///
/// Maintained synchronously by the tracker on every status change; there is
/// no polling loop. A project whose only pending change is `Hidden` stays
/// out of the set even though it is not up to date.
#[derive(Debug, Default)]
pub struct NotificationAggregator {
    notified: Mutex<BTreeSet<ProjectId>>,
}

impl NotificationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current notification decision for one project.
    pub fn update(&self, id: &ProjectId, needs_notification: bool) {
        let mut notified = self.lock();
        let changed = if needs_notification {
            notified.insert(id.clone())
        } else {
            notified.remove(id)
        };
        if changed {
            trace!(project = %id, needs_notification, "notification set updated");
        }
    }

    /// Forget a project entirely (unregistration).
    pub fn remove(&self, id: &ProjectId) {
        self.lock().remove(id);
    }

    /// Projects that should currently surface the reload notification.
    pub fn projects_needing_notification(&self) -> BTreeSet<ProjectId> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<ProjectId>> {
        self.notified.lock().expect("notification set poisoned")
    }
}
