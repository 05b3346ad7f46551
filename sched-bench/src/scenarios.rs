//! The three benchmark scenarios, one function per
//! `original_source/src/{coro-mutex-test,std-mutex-test,race-condition}`
//! program: `producers` tasks each perform `iterations` critical-section
//! increments, guarded respectively by [`sched_core::AsyncMutex`], a
//! blocking [`std::sync::Mutex`], and (deliberately) nothing at all.
//!
//! Smoke-tested from `sched-bench/tests/`, not inline here: `run_coro_mutex`
//! and `run_race_condition` both bind `sched_core`'s process-wide
//! `TaskManager` singleton, which only ever binds to the first pool a
//! process ever passes to `TaskManager::init`. A second such scenario
//! sharing this crate's test process — even sequentially, once the first
//! has stopped its pool — would have its tasks silently routed to a pool
//! that no longer accepts submissions. One test binary per singleton-using
//! scenario sidesteps this, the same way `sched-core/tests/mutex_mutual_exclusion.rs`
//! already isolates its own singleton-touching property test.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use sched_core::{spawn, yield_now, AsyncMutex, Pool, TaskManager};

use crate::counter::AtomicMultipleCounter;
use crate::dumper::CounterDumper;
use crate::error::BenchError;
use crate::SharedStop;

/// Parameters shared by all three scenarios, gathered from the CLI.
pub struct ScenarioConfig {
    pub workers: usize,
    pub producers: usize,
    pub iterations: usize,
    pub output: std::path::PathBuf,
    pub dump_interval: Duration,
}

/// Busy-polls `condition`, sleeping briefly between checks, bailing out
/// early if `stop` is set from outside (SIGINT).
fn wait_for_quiescence(stop: &SharedStop, mut condition: impl FnMut() -> bool) {
    while !condition() && !stop.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Producers contend for [`sched_core::AsyncMutex`]: on contention a task
/// parks instead of blocking its worker. Grounded on
/// `src/coro-mutex-test/main.cpp`.
pub fn run_coro_mutex(cfg: &ScenarioConfig, stop: SharedStop) -> Result<i64, BenchError> {
    let pool = Arc::new(Pool::new(cfg.workers));
    TaskManager::init(pool.clone());
    pool.start();

    let mutex = Arc::new(AsyncMutex::new(()));
    let counter = Arc::new(AtomicMultipleCounter::new(cfg.producers));
    let mut dumper = CounterDumper::new(counter.clone(), &cfg.output, cfg.dump_interval);
    dumper.start();

    let remaining = Arc::new(AtomicUsize::new(cfg.producers));

    for id in 0..cfg.producers {
        let mutex = mutex.clone();
        let counter = counter.clone();
        let remaining = remaining.clone();
        let stop = stop.clone();
        let iterations = cfg.iterations;
        let task = spawn(async move {
            for _ in 0..iterations {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let guard = mutex.lock().await;
                counter.increment(id);
                drop(guard);
            }
            tracing::debug!(producer = id, "coro-mutex producer finished");
            remaining.fetch_sub(1, Ordering::SeqCst);
        });
        TaskManager::execute(task);
    }

    wait_for_quiescence(&stop, || remaining.load(Ordering::SeqCst) == 0);
    pool.stop();
    dumper.stop()?;

    Ok(counter.get_total())
}

/// Producers contend for a conventional blocking mutex: the critical
/// section never suspends, so this needs only the pool, not
/// [`sched_core::Task`]/[`TaskManager`]. Grounded on
/// `src/std-mutex-test/main.cpp`.
pub fn run_std_mutex(cfg: &ScenarioConfig, stop: SharedStop) -> Result<i64, BenchError> {
    let pool = Pool::new(cfg.workers);
    pool.start();

    let mutex = Arc::new(StdMutex::new(()));
    let counter = Arc::new(AtomicMultipleCounter::new(cfg.producers));
    let mut dumper = CounterDumper::new(counter.clone(), &cfg.output, cfg.dump_interval);
    dumper.start();

    let remaining = Arc::new(AtomicUsize::new(cfg.producers));

    for id in 0..cfg.producers {
        let mutex = mutex.clone();
        let counter = counter.clone();
        let remaining = remaining.clone();
        let stop = stop.clone();
        let iterations = cfg.iterations;
        pool.submit(Box::new(move || {
            for _ in 0..iterations {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let _guard = mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                counter.increment(id);
            }
            tracing::debug!(producer = id, "std-mutex producer finished");
            remaining.fetch_sub(1, Ordering::SeqCst);
        }));
    }

    wait_for_quiescence(&stop, || remaining.load(Ordering::SeqCst) == 0);
    pool.stop();
    dumper.stop()?;

    Ok(counter.get_total())
}

/// A shared counter incremented through a separate load and store rather
/// than a single atomic read-modify-write. This is the baseline: no Rust
/// undefined behaviour occurs (every access is an ordinary atomic load or
/// store), but concurrent producers can still observe and overwrite each
/// other's updates, so the final total is typically *less* than
/// `producers * iterations`. That gap is the point of the scenario —
/// `src/race-condition/main.cpp`'s unguarded `++x` loses updates the same
/// way, for the same reason: increment is not atomic as a whole.
struct RacyCounter(AtomicI64);

impl RacyCounter {
    fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    fn racy_increment(&self) {
        let current = self.0.load(Ordering::Relaxed);
        self.0.store(current + 1, Ordering::Relaxed);
    }

    fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Producers increment a shared counter with no synchronization at all.
/// Demonstrates why the other two scenarios need a mutex in the first
/// place. Grounded on `src/race-condition/main.cpp`.
pub fn run_race_condition(cfg: &ScenarioConfig, stop: SharedStop) -> Result<i64, BenchError> {
    let pool = Arc::new(Pool::new(cfg.workers));
    TaskManager::init(pool.clone());
    pool.start();

    let counter = Arc::new(RacyCounter::new());
    let remaining = Arc::new(AtomicUsize::new(cfg.producers));

    for id in 0..cfg.producers {
        let counter = counter.clone();
        let remaining = remaining.clone();
        let stop = stop.clone();
        let iterations = cfg.iterations;
        let task = spawn(async move {
            for _ in 0..iterations {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                yield_now().await;
                counter.racy_increment();
            }
            tracing::debug!(producer = id, "race-condition producer finished");
            remaining.fetch_sub(1, Ordering::SeqCst);
        });
        TaskManager::execute(task);
    }

    wait_for_quiescence(&stop, || remaining.load(Ordering::SeqCst) == 0);
    pool.stop();

    Ok(counter.get())
}
