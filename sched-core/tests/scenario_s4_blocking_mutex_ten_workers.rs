//! S4: the same shape as S3 but guarded by a conventional blocking mutex
//! instead of the async one — a correctness baseline the async mutex is
//! benchmarked against, not a `sched-core` API under test. No task or
//! task manager is involved: a blocking critical section never suspends,
//! so plain pool jobs are enough.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sched_core::Pool;

const WORKERS: usize = 10;
const TASKS: usize = 10;
const ITERATIONS: usize = 10_000;

#[test]
fn s4_ten_workers_ten_tasks_blocking_mutex() {
    let pool = Pool::new(WORKERS);
    pool.start();

    let mutex = Arc::new(Mutex::new(0usize));
    let remaining = Arc::new(AtomicUsize::new(TASKS));

    for _ in 0..TASKS {
        let mutex = mutex.clone();
        let remaining = remaining.clone();
        pool.submit(Box::new(move || {
            for _ in 0..ITERATIONS {
                *mutex.lock().unwrap() += 1;
            }
            remaining.fetch_sub(1, Ordering::SeqCst);
        }));
    }

    let start = std::time::Instant::now();
    while remaining.load(Ordering::SeqCst) != 0 {
        assert!(start.elapsed() < Duration::from_secs(30), "scenario timed out");
        std::thread::sleep(Duration::from_millis(1));
    }
    pool.stop();

    assert_eq!(*mutex.lock().unwrap(), TASKS * ITERATIONS);
}
