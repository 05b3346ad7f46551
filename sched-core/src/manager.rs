//! The task manager: a process-wide routing point between resumable
//! continuations and the active worker pool.

use std::sync::{Arc, OnceLock};

use crate::pool::Pool;
use crate::task::Task;

static POOL: OnceLock<Arc<Pool>> = OnceLock::new();

/// Process-wide singleton that routes tasks onto a [`Pool`].
///
/// This is the idiomatic analogue of a Meyers singleton: `init` may only
/// succeed once per process (an `OnceLock` cannot be reset), so a binary
/// that needs more than one pool over its lifetime — `sched-bench` running
/// several scenarios back to back — must thread its own `Arc<Pool>` through
/// the parts of a scenario that need direct pool access (e.g. `stop()`)
/// and rely on `TaskManager` purely for the routing `execute` performs.
/// See `DESIGN.md` for the Open Question this resolves.
pub struct TaskManager;

impl TaskManager {
    /// Binds the manager to `pool`. Must be called before any `execute`.
    /// A second call is a no-op: the first pool bound for the life of the
    /// process stays bound.
    pub fn init(pool: Arc<Pool>) {
        if POOL.set(pool).is_err() {
            tracing::debug!("TaskManager::init called again; keeping the first pool");
        }
    }

    /// Submits `task` to the bound pool unless it is already done.
    ///
    /// Calling this before `init` is a contract violation (spec.md §7 item
    /// 2): debug builds assert, release builds silently drop the task.
    pub fn execute(task: Task) {
        if task.done() {
            return;
        }
        match POOL.get() {
            Some(pool) => {
                let pool = pool.clone();
                pool.submit(Box::new(move || {
                    task.resume();
                }));
            }
            None => {
                debug_assert!(false, "TaskManager::execute called before TaskManager::init");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // `TaskManager` is a process-wide singleton, so exercising `init`/
    // `execute` against a real pool lives in `sched-core/tests/`, where
    // each test binary gets its own process and therefore its own
    // uninitialized `OnceLock`. A unit test here that called `init` would
    // leak state into every other test in this module's binary.
}
