//! A minimal cooperative scheduling fabric: a lock-free MPMC queue, a
//! stackless-style task/continuation abstraction built on `Future`, a
//! work-stealing worker pool, a process-wide task manager, and a
//! suspension-based async mutex built on top of all four.
//!
//! None of the five pieces perform I/O or know about CLI flags, logging
//! configuration, or process lifetime beyond what `Pool::start`/`stop`
//! need — those concerns belong to the binary that drives this crate.

pub mod manager;
pub mod mutex;
pub mod pool;
pub mod queue;
pub mod task;

pub use manager::TaskManager;
pub use mutex::{AsyncMutex, AsyncMutexGuard, Awaiter};
pub use pool::{Job, Pool};
pub use queue::Queue;
pub use task::{spawn, yield_now, Task, Yield};
