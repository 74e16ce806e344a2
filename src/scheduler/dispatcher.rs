// src/scheduler/dispatcher.rs

//! Per-project dispatch loop: debounce merging plus collision resolution.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use tracing::{debug, trace};

use crate::scheduler::ReloadExecutor;
use crate::types::ReloadCollisionPolicy;

#[derive(Debug, Clone, Copy)]
struct DispatchRequest {
    explicit: bool,
    enqueued: Instant,
}

/// Handle to one project's dispatch loop.
///
/// Dropping the handle closes the request channel; the loop finishes any
/// reload already executing and then exits. A pending (not-yet-started)
/// request that was still being merged is executed before exit so no
/// request is silently lost on shutdown — callers that want the result
/// discarded unregister the project, which makes the execution a no-op.
#[derive(Debug)]
pub struct ReloadDispatcher {
    tx: mpsc::UnboundedSender<DispatchRequest>,
}

impl ReloadDispatcher {
    /// Spawn the dispatch loop for one project.
    pub fn spawn<E: ReloadExecutor>(executor: Arc<E>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_dispatch_loop(executor, rx));
        Self { tx }
    }

    /// Enqueue a reload request; returns immediately.
    pub fn request(&self, explicit: bool) {
        let req = DispatchRequest {
            explicit,
            enqueued: Instant::now(),
        };
        if self.tx.send(req).is_err() {
            trace!("dispatch loop already shut down; request dropped");
        }
    }
}

async fn run_dispatch_loop<E: ReloadExecutor>(
    executor: Arc<E>,
    mut rx: mpsc::UnboundedReceiver<DispatchRequest>,
) {
    // A request drained after an execution but enqueued after it finished
    // belongs to the next cycle; it is carried over instead of re-queued.
    let mut carry: Option<DispatchRequest> = None;

    loop {
        let first = match carry.take() {
            Some(req) => req,
            None => match rx.recv().await {
                Some(req) => req,
                None => break,
            },
        };

        let tuning = executor.tuning();
        let mut explicit = first.explicit;
        let merge_started = Instant::now();
        let mut channel_closed = false;

        // Debounce: each new request re-arms the merging span. The
        // force-flush bound keeps a steady drip of requests from starving
        // the reload indefinitely.
        loop {
            if merge_started.elapsed() >= tuning.max_merge_delay {
                debug!("merge window force-flushed");
                break;
            }
            match timeout(tuning.merging_span, rx.recv()).await {
                Ok(Some(next)) => {
                    explicit |= next.explicit;
                    trace!("merged reload request into pending window");
                }
                Ok(None) => {
                    // Channel closed; still run the merged request.
                    channel_closed = true;
                    break;
                }
                Err(_) => break, // span expired with no new request
            }
        }

        match tuning.collision_policy {
            ReloadCollisionPolicy::Duplicate => {
                // Overlap is allowed: run detached and keep listening, so a
                // request arriving mid-flight starts a concurrent execution.
                let executor = Arc::clone(&executor);
                tokio::spawn(async move {
                    executor.execute(explicit).await;
                });
            }
            policy => {
                executor.execute(explicit).await;
                let finished = Instant::now();

                // Requests that arrived while we were executing are queued
                // in the channel now.
                let mut rerun: Option<bool> = None;
                loop {
                    match rx.try_recv() {
                        Ok(req) if req.enqueued <= finished => match policy {
                            ReloadCollisionPolicy::Cancel => {
                                // No data loss: run exactly once more below.
                                rerun = Some(rerun.unwrap_or(false) | req.explicit);
                            }
                            ReloadCollisionPolicy::Ignore => {
                                // The finished reload read the settings
                                // state at execution time; drop the request.
                                trace!("request during in-flight reload ignored");
                            }
                            ReloadCollisionPolicy::Duplicate => unreachable!(),
                        },
                        Ok(req) => {
                            carry = Some(req);
                            break;
                        }
                        Err(_) => break,
                    }
                }

                if let Some(explicit) = rerun {
                    debug!("re-running reload for requests that collided with execution");
                    executor.execute(explicit).await;
                }
            }
        }

        if channel_closed {
            break;
        }
    }

    trace!("dispatch loop exiting");
}
