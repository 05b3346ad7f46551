//! A work-stealing worker pool: `N` OS threads, one MPMC run queue per
//! worker, random submission and random victim selection for stealing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use rand::Rng;

use crate::queue::Queue;

/// A unit of work submitted to the pool: a nullary closure, typically one
/// that resumes a [`crate::task::Task`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size work-stealing thread pool.
///
/// Each worker first drains its own queue, then attempts up to `2 * N`
/// random steals from peers before re-checking `running` and looping. This
/// busy-waits on idle by design — see the module-level design notes in
/// `SPEC_FULL.md` §9 for the tradeoff; a park/notify variant is a
/// self-contained change to the loop below, not implemented here.
pub struct Pool {
    queues: Vec<Arc<Queue<Job>>>,
    running: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// Constructs a pool with `n` per-worker queues. Does not spawn any
    /// threads yet; call [`Pool::start`] for that.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "a pool needs at least one worker");
        let queues = (0..n).map(|_| Arc::new(Queue::new())).collect();
        Self {
            queues,
            running: Arc::new(AtomicBool::new(true)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Number of per-worker run queues (and worker threads once started).
    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    /// Spawns the `N` worker threads. Each enters its scheduling loop
    /// immediately.
    pub fn start(&self) {
        let mut workers = self.workers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for id in 0..self.queues.len() {
            let queues = self.queues.clone();
            let running = self.running.clone();
            let handle = thread::Builder::new()
                .name(format!("Pool Worker: {id}"))
                .spawn(move || {
                    tracing::debug!(worker = id, "worker starting");
                    worker_loop(id, &queues, &running);
                    tracing::debug!(worker = id, "worker stopping");
                })
                .expect("failed to spawn pool worker thread");
            workers.push(handle);
        }
    }

    /// Enqueues `job` on a uniformly random worker queue. A silent no-op
    /// once the pool has been (or is being) stopped.
    pub fn submit(&self, job: Job) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        let idx = rand::thread_rng().gen_range(0..self.queues.len());
        self.queues[idx].enqueue(job);
    }

    /// Clears the running flag and joins every worker thread. Workers exit
    /// their loop within one iteration; jobs still resident in queues at
    /// that point are dropped, never run.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let mut workers = self.workers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(id: usize, queues: &[Arc<Queue<Job>>], running: &AtomicBool) {
    let worker_count = queues.len();
    let max_steal_attempts = 2 * worker_count;

    loop {
        if let Some(job) = queues[id].dequeue() {
            job();
            continue;
        }

        if let Some(job) = try_steal(id, queues, max_steal_attempts) {
            job();
            continue;
        }

        if !running.load(Ordering::Acquire) {
            break;
        }
        // Intentional busy loop: see struct-level docs.
    }
}

fn try_steal(self_id: usize, queues: &[Arc<Queue<Job>>], max_attempts: usize) -> Option<Job> {
    let worker_count = queues.len();
    if worker_count <= 1 {
        return None;
    }
    let mut rng = rand::thread_rng();
    for _ in 0..max_attempts {
        let victim = rng.gen_range(0..worker_count);
        if victim == self_id {
            continue;
        }
        if let Some(job) = queues[victim].dequeue() {
            return Some(job);
        }
    }
    None
}
