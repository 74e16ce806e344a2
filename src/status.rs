// src/status.rs

//! Per-project status state machine with causal-stamp ordering.
//!
//! This is a pure, synchronous state machine: it owns no channels, timers or
//! IO, and is exercised directly by the ordering-law tests. Producers on any
//! thread feed it stamped events; the total order on [`Stamp`]s decides
//! whether an event is stale.
//!
//! Severity only ever moves forward for stale events: a late "everything is
//! fine" signal cannot erase a legitimately newer "something changed" signal,
//! and a "something changed" signal older than the most recent successful
//! synchronization is a no-op.

use std::sync::Mutex;

use tracing::trace;

use crate::stamp::Stamp;
use crate::types::ModificationType;

/// Discriminant of the current status, exposed for persistence and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Synchronized,
    Modified,
    Dirty,
    Reverted,
    Broken,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Synchronized(Stamp),
    Modified(Stamp, ModificationType),
    Dirty(Stamp, ModificationType),
    Reverted(Stamp),
    Broken(Stamp),
}

impl State {
    fn stamp(&self) -> Stamp {
        match *self {
            State::Synchronized(s)
            | State::Modified(s, _)
            | State::Dirty(s, _)
            | State::Reverted(s)
            | State::Broken(s) => s,
        }
    }

    fn kind(&self) -> StatusKind {
        match self {
            State::Synchronized(_) => StatusKind::Synchronized,
            State::Modified(..) => StatusKind::Modified,
            State::Dirty(..) => StatusKind::Dirty,
            State::Reverted(_) => StatusKind::Reverted,
            State::Broken(_) => StatusKind::Broken,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: State,
    /// Stamp of the most recent accepted `mark_synchronized`. Change signals
    /// older than this are from before the reload snapshot and are dropped.
    last_sync: Stamp,
}

/// Tracks dirty/modified/synchronized/broken/reverted status for one
/// registered project.
#[derive(Debug)]
pub struct ProjectStatus {
    inner: Mutex<Inner>,
}

impl ProjectStatus {
    /// Fresh status; a newly registered project starts out synchronized at
    /// pre-history.
    pub fn new() -> Self {
        Self::with_state(State::Synchronized(Stamp::ZERO))
    }

    /// Status restored from a persisted snapshot. Stamps restart at
    /// pre-history on every process run, so restored state carries
    /// `Stamp::ZERO`.
    pub fn restored(kind: StatusKind, modification: ModificationType) -> Self {
        let state = match kind {
            StatusKind::Synchronized => State::Synchronized(Stamp::ZERO),
            StatusKind::Reverted => State::Reverted(Stamp::ZERO),
            StatusKind::Modified => State::Modified(Stamp::ZERO, modification),
            StatusKind::Dirty => State::Dirty(Stamp::ZERO, modification),
            StatusKind::Broken => State::Broken(Stamp::ZERO),
        };
        Self::with_state(state)
    }

    fn with_state(state: State) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                last_sync: Stamp::ZERO,
            }),
        }
    }

    /// True only while the project needs no resync (`Synchronized` or
    /// `Reverted`).
    pub fn is_up_to_date(&self) -> bool {
        matches!(
            self.kind(),
            StatusKind::Synchronized | StatusKind::Reverted
        )
    }

    pub fn is_dirty(&self) -> bool {
        self.kind() == StatusKind::Dirty
    }

    pub fn is_broken(&self) -> bool {
        self.kind() == StatusKind::Broken
    }

    pub fn kind(&self) -> StatusKind {
        self.lock().state.kind()
    }

    /// Effective type of the most causally-relevant unresolved change.
    /// `Unknown` while there is no pending modification to describe.
    pub fn modification_type(&self) -> ModificationType {
        match self.lock().state {
            State::Modified(_, ty) | State::Dirty(_, ty) => ty,
            State::Synchronized(_) | State::Reverted(_) | State::Broken(_) => {
                ModificationType::Unknown
            }
        }
    }

    /// Record an irreversible "needs full resync" signal.
    ///
    /// Dirty is sticky: once observed at any stamp not older than the last
    /// synchronization, only a later `mark_synchronized` clears it. Stale
    /// calls contribute no type information.
    pub fn mark_dirty(&self, stamp: Stamp, ty: ModificationType) {
        self.update("dirty", stamp, |state, fresh| {
            let merged = match *state {
                State::Modified(cur, prev) | State::Dirty(cur, prev) => {
                    if fresh && stamp >= cur {
                        prev.merge(ty)
                    } else {
                        prev
                    }
                }
                _ if fresh => ty,
                _ => ModificationType::Unknown,
            };
            Some(State::Dirty(stamp.max(state.stamp()), merged))
        });
    }

    /// Record a provisional pending change.
    pub fn mark_modified(&self, stamp: Stamp, ty: ModificationType) {
        self.update("modified", stamp, |state, fresh| match *state {
            State::Synchronized(cur) => {
                if fresh && stamp >= cur {
                    Some(State::Modified(stamp, ty))
                } else {
                    None
                }
            }
            State::Modified(cur, prev) => {
                if fresh && stamp >= cur {
                    Some(State::Modified(stamp, prev.merge(ty)))
                } else {
                    None
                }
            }
            // Dirty absorbs modifications; type merges only for fresh stamps.
            State::Dirty(cur, prev) => {
                let merged = if fresh && stamp >= cur { prev.merge(ty) } else { prev };
                Some(State::Dirty(stamp.max(cur), merged))
            }
            State::Reverted(cur) => Some(State::Modified(stamp.max(cur), ty)),
            // A change on top of a failed reload can only be resolved by a
            // successful reload.
            State::Broken(cur) => Some(State::Dirty(stamp.max(cur), ty)),
        });
    }

    /// Signal that a previously modified file returned to its synchronized
    /// content. Cannot clear dirtiness or brokenness.
    pub fn mark_reverted(&self, stamp: Stamp) {
        self.update("reverted", stamp, |state, fresh| match *state {
            State::Modified(cur, _) if fresh && stamp >= cur => {
                Some(State::Reverted(stamp))
            }
            State::Reverted(cur) if fresh => Some(State::Reverted(stamp.max(cur))),
            _ => None,
        });
    }

    /// Record a successful reload taken at `stamp`.
    ///
    /// A stale synchronization (stamp older than the newest stamp already
    /// observed) is a no-op: it must not erase changes that happened after
    /// the reload snapshot was taken.
    pub fn mark_synchronized(&self, stamp: Stamp) {
        let mut inner = self.lock();
        if stamp < inner.state.stamp() {
            trace!(?stamp, current = ?inner.state, "stale synchronization ignored");
            return;
        }
        inner.state = State::Synchronized(stamp);
        inner.last_sync = stamp;
    }

    /// Record a failed reload attempt. Broken is sticky the same way Dirty
    /// is, until a successful `mark_synchronized`.
    pub fn mark_broken(&self, stamp: Stamp) {
        self.update("broken", stamp, |state, _fresh| match *state {
            State::Synchronized(cur) | State::Reverted(cur) => {
                Some(State::Broken(stamp.max(cur)))
            }
            State::Modified(cur, ty) => Some(State::Dirty(stamp.max(cur), ty)),
            State::Dirty(cur, ty) => Some(State::Dirty(stamp.max(cur), ty)),
            State::Broken(cur) => Some(State::Broken(stamp.max(cur))),
        });
    }

    /// Shared transition plumbing.
    ///
    /// `fresh` is false for calls whose stamp predates the last accepted
    /// synchronization; those are dropped outright. The closure returns the
    /// replacement state or `None` for a no-op.
    fn update(
        &self,
        event: &'static str,
        stamp: Stamp,
        transition: impl FnOnce(&State, bool) -> Option<State>,
    ) {
        let mut inner = self.lock();
        if stamp < inner.last_sync {
            trace!(
                event,
                ?stamp,
                last_sync = ?inner.last_sync,
                "event predates last synchronization; ignored"
            );
            return;
        }
        let fresh = stamp >= inner.state.stamp();
        if let Some(next) = transition(&inner.state, fresh) {
            trace!(event, ?stamp, from = ?inner.state, to = ?next, "status transition");
            inner.state = next;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("project status poisoned")
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::new()
    }
}
