//! P3: with `K` tasks each performing `M` critical-section increments
//! guarded by the async mutex, the final counter is exactly `K * M`.
//!
//! `TaskManager` is a process-wide singleton, so this property gets its
//! own test binary (one `#[test]` per file under `tests/`) rather than
//! sharing a process with the other mutex properties — exactly the reason
//! the benchmark this crate is modeled on ran each scenario as a separate
//! executable instead of one program with subcommands that share process
//! state.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sched_core::{spawn, AsyncMutex, Pool, TaskManager};

const K: usize = 10;
const M: usize = 10_000;
const WORKERS: usize = 4;

#[test]
fn p3_k_tasks_m_increments_yield_k_times_m() {
    let pool = Arc::new(Pool::new(WORKERS));
    TaskManager::init(pool.clone());
    pool.start();

    let mutex = Arc::new(AsyncMutex::new(()));
    let counter = Arc::new(AtomicUsize::new(0));
    let remaining = Arc::new(AtomicUsize::new(K));

    for _ in 0..K {
        let mutex = mutex.clone();
        let counter = counter.clone();
        let remaining = remaining.clone();
        let task = spawn(async move {
            for _ in 0..M {
                let guard = mutex.lock().await;
                counter.fetch_add(1, Ordering::SeqCst);
                drop(guard);
            }
            remaining.fetch_sub(1, Ordering::SeqCst);
        });
        TaskManager::execute(task);
    }

    common::wait_until(|| remaining.load(Ordering::SeqCst) == 0);
    pool.stop();

    assert_eq!(counter.load(Ordering::SeqCst), K * M);
}
