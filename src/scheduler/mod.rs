// src/scheduler/mod.rs

//! Debounced, collision-safe reload scheduling.
//!
//! Each registered project gets its own [`ReloadDispatcher`]: a background
//! loop that merges bursts of reload requests inside the configured merging
//! span and applies the collision policy when requests arrive while a reload
//! is already executing.
//!
//! The dispatcher talks to a [`ReloadExecutor`] instead of the tracker
//! directly. Production code uses the tracker's executor; tests can provide
//! their own implementation that records executions without touching any
//! collaborator.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::types::ReloadCollisionPolicy;

pub mod dispatcher;

pub use dispatcher::ReloadDispatcher;

/// Scheduling knobs read by the dispatcher at the start of every cycle, so
/// runtime changes take effect without respawning anything.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerTuning {
    /// Debounce window: requests landing within this span of each other
    /// collapse into one execution.
    pub merging_span: Duration,
    /// Upper bound on how long a pending request may keep being merged. A
    /// steady drip of requests is force-flushed once this elapses.
    pub max_merge_delay: Duration,
    pub collision_policy: ReloadCollisionPolicy,
}

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            merging_span: Duration::from_millis(300),
            max_merge_delay: Duration::from_secs(3),
            collision_policy: ReloadCollisionPolicy::default(),
        }
    }
}

/// Trait abstracting how a merged reload request is executed.
pub trait ReloadExecutor: Send + Sync + 'static {
    /// Current scheduling knobs.
    fn tuning(&self) -> SchedulerTuning;

    /// Run one reload. The implementation is responsible for snapshotting
    /// the settings state at execution time and feeding the outcome back
    /// into the project status.
    fn execute(
        &self,
        explicit: bool,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
