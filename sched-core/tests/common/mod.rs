//! Shared helpers for `sched-core`'s integration tests. This lives under
//! `tests/common/` (not directly under `tests/`) so Cargo treats it as a
//! plain module rather than its own test binary.

use std::future::Future;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::time::{Duration, Instant};

/// Busy-polls `condition` until it returns `true`, panicking if it never
/// does within a generous bound. Standing in for the benchmark harness's
/// own convergence checks, since these tests have no notion of "done" all
/// on their own beyond "every spawned task's counter reached its target".
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        if start.elapsed() > Duration::from_secs(30) {
            panic!("condition did not become true within the test timeout");
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn noop_waker() -> Waker {
    fn clone(_: *const ()) -> RawWaker {
        RawWaker::new(std::ptr::null(), &VTABLE)
    }
    fn noop(_: *const ()) {}
    static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
    // Safety: the vtable's functions are all no-ops or return a RawWaker
    // pointing at the same null data pointer; nothing ever dereferences it.
    unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
}

/// Polls `fut` exactly once with a waker that does nothing if woken.
///
/// Only sound to use on a future known to resolve on its very first poll
/// (e.g. locking an uncontended [`sched_core::AsyncMutex`] from outside the
/// scheduler) — anything that returns `Pending` here would need a real
/// waker to ever make progress again.
pub fn poll_once_ready<F: Future>(fut: F) -> F::Output {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    let mut fut = Box::pin(fut);
    match fut.as_mut().poll(&mut cx) {
        Poll::Ready(value) => value,
        Poll::Pending => panic!("expected the future to resolve on its first poll"),
    }
}
