//! The plumbing behind the `sched-bench` CLI, split into a library target
//! so `sched-bench/tests/*.rs` can exercise individual scenarios as
//! isolated test binaries rather than `#[cfg(test)]` units sharing one
//! process with `sched_core`'s process-wide `TaskManager` singleton.

pub mod counter;
pub mod dumper;
pub mod error;
pub mod scenarios;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// The stop-request flag external collaborators use to ask for a clean
/// shutdown (spec.md §1/§5: "a way to be signalled to stop"). Starts
/// `false`; a SIGINT handler sets it `true` in the CLI binary; every
/// scenario checks it at its loop head, the same way user code is expected
/// to check a user-visible `running` flag before each iteration.
pub type SharedStop = Arc<AtomicBool>;
