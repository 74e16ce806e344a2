// src/listener.rs

//! Multi-listener fan-out with explicit unsubscribe tokens.
//!
//! Collaborators and the tracker both need small observer lists (reload
//! lifecycle events, settings-files-list changes). Instead of weak
//! references, subscribing returns a [`Subscription`] handle whose
//! unsubscribe action fires exactly once, either explicitly or on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Handle returned by a subscribe call.
///
/// Unsubscribes when [`Subscription::unsubscribe`] is called or when the
/// handle is dropped, whichever comes first; the underlying action runs at
/// most once.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Explicitly remove the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Observer list keyed by an internal id so removal is O(1).
pub struct ListenerSet<L: ?Sized> {
    inner: Arc<Mutex<Listeners<L>>>,
}

struct Listeners<L: ?Sized> {
    next_id: u64,
    entries: HashMap<u64, Arc<L>>,
}

impl<L: ?Sized + Send + Sync + 'static> ListenerSet<L> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: HashMap::new(),
            })),
        }
    }

    /// Add a listener; it stays registered until the returned handle
    /// unsubscribes.
    pub fn subscribe(&self, listener: Arc<L>) -> Subscription {
        let id = {
            let mut inner = self.inner.lock().expect("listener set poisoned");
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.insert(id, listener);
            id
        };

        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            if let Ok(mut inner) = inner.lock() {
                inner.entries.remove(&id);
            }
        })
    }

    /// Invoke `f` for every current listener.
    ///
    /// Listeners are snapshotted first so callbacks may subscribe or
    /// unsubscribe without deadlocking.
    pub fn notify(&self, f: impl Fn(&L)) {
        let snapshot: Vec<Arc<L>> = {
            let inner = self.inner.lock().expect("listener set poisoned");
            inner.entries.values().cloned().collect()
        };
        for listener in snapshot {
            f(&listener);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("listener set poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: ?Sized + Send + Sync + 'static> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for ListenerSet<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ?Sized> std::fmt::Debug for ListenerSet<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet").finish_non_exhaustive()
    }
}
