// tests/scheduler_dispatch.rs

//! Debounce merging and collision policies of the dispatch loop, exercised
//! against a fake executor.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::sleep;

use reloadtrack::ReloadCollisionPolicy;
use reloadtrack::scheduler::{ReloadDispatcher, ReloadExecutor, SchedulerTuning};
use reloadtrack_test_utils::{init_tracing, wait_until};

/// Executor that records executions and simulates work with a sleep.
struct FakeReloadExecutor {
    tuning: Mutex<SchedulerTuning>,
    work: Duration,
    executions: AtomicUsize,
    explicit_executions: AtomicUsize,
    running: AtomicUsize,
    max_concurrency: AtomicUsize,
}

impl FakeReloadExecutor {
    fn new(tuning: SchedulerTuning, work: Duration) -> Arc<Self> {
        Arc::new(Self {
            tuning: Mutex::new(tuning),
            work,
            executions: AtomicUsize::new(0),
            explicit_executions: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_concurrency: AtomicUsize::new(0),
        })
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl ReloadExecutor for FakeReloadExecutor {
    fn tuning(&self) -> SchedulerTuning {
        *self.tuning.lock().unwrap()
    }

    fn execute(&self, explicit: bool) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrency.fetch_max(running, Ordering::SeqCst);

            sleep(self.work).await;

            self.executions.fetch_add(1, Ordering::SeqCst);
            if explicit {
                self.explicit_executions.fetch_add(1, Ordering::SeqCst);
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

fn tuning(
    merging_span: u64,
    max_merge_delay: u64,
    collision_policy: ReloadCollisionPolicy,
) -> SchedulerTuning {
    SchedulerTuning {
        merging_span: Duration::from_millis(merging_span),
        max_merge_delay: Duration::from_millis(max_merge_delay),
        collision_policy,
    }
}

#[tokio::test]
async fn burst_of_requests_merges_into_one_execution() {
    init_tracing();
    let executor = FakeReloadExecutor::new(
        tuning(50, 3_000, ReloadCollisionPolicy::Cancel),
        Duration::from_millis(1),
    );
    let dispatcher = ReloadDispatcher::spawn(Arc::clone(&executor));

    for _ in 0..10 {
        dispatcher.request(false);
    }
    dispatcher.request(true);

    wait_until("merged execution", || executor.executions() == 1).await;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(executor.executions(), 1);
    // One merged request carrying the explicit flag of any member.
    assert_eq!(executor.explicit_executions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_policy_reruns_exactly_once() {
    init_tracing();
    let executor = FakeReloadExecutor::new(
        tuning(10, 3_000, ReloadCollisionPolicy::Cancel),
        Duration::from_millis(200),
    );
    let dispatcher = ReloadDispatcher::spawn(Arc::clone(&executor));

    dispatcher.request(false);
    // Wait until the first execution is in flight, then collide with it.
    wait_until("execution started", || {
        executor.running.load(Ordering::SeqCst) == 1
    })
    .await;
    dispatcher.request(false);
    dispatcher.request(false);

    wait_until("rerun finished", || executor.executions() == 2).await;
    sleep(Duration::from_millis(300)).await;
    assert_eq!(executor.executions(), 2);
    assert_eq!(executor.max_concurrency.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ignore_policy_drops_colliding_requests() {
    init_tracing();
    let executor = FakeReloadExecutor::new(
        tuning(10, 3_000, ReloadCollisionPolicy::Ignore),
        Duration::from_millis(200),
    );
    let dispatcher = ReloadDispatcher::spawn(Arc::clone(&executor));

    dispatcher.request(false);
    wait_until("execution started", || {
        executor.running.load(Ordering::SeqCst) == 1
    })
    .await;
    dispatcher.request(false);

    wait_until("execution finished", || executor.executions() == 1).await;
    sleep(Duration::from_millis(300)).await;
    assert_eq!(executor.executions(), 1);
}

#[tokio::test]
async fn duplicate_policy_allows_overlap() {
    init_tracing();
    let executor = FakeReloadExecutor::new(
        tuning(10, 3_000, ReloadCollisionPolicy::Duplicate),
        Duration::from_millis(300),
    );
    let dispatcher = ReloadDispatcher::spawn(Arc::clone(&executor));

    dispatcher.request(false);
    wait_until("first execution started", || {
        executor.running.load(Ordering::SeqCst) >= 1
    })
    .await;
    dispatcher.request(false);

    wait_until("both executions finished", || executor.executions() == 2).await;
    assert_eq!(executor.max_concurrency.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn steady_request_drip_is_force_flushed() {
    init_tracing();
    let executor = FakeReloadExecutor::new(
        tuning(80, 200, ReloadCollisionPolicy::Cancel),
        Duration::from_millis(1),
    );
    let dispatcher = ReloadDispatcher::spawn(Arc::clone(&executor));

    // Each request lands inside the previous one's merging span, so without
    // the force-flush bound nothing would ever execute.
    let started = std::time::Instant::now();
    for _ in 0..20 {
        dispatcher.request(false);
        sleep(Duration::from_millis(40)).await;
    }
    wait_until("flushed execution", || executor.executions() >= 1).await;
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn dropping_the_dispatcher_still_runs_the_pending_request() {
    init_tracing();
    let executor = FakeReloadExecutor::new(
        tuning(100, 3_000, ReloadCollisionPolicy::Cancel),
        Duration::from_millis(1),
    );
    let dispatcher = ReloadDispatcher::spawn(Arc::clone(&executor));

    dispatcher.request(false);
    drop(dispatcher);

    wait_until("pending request executed", || executor.executions() == 1).await;
}
