//! Tasks: movable handles to a suspended, cooperatively scheduled
//! computation, plus the sentinel yield future that is the only way user
//! code can voluntarily give the worker back to the scheduler.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use crate::manager::TaskManager;

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

// A task's frame is polled by at most one thread at a time, but a waker can
// fire (from another thread, or synchronously from inside the very poll
// call it wakes) while that poll is in progress — `yield_now()` always does
// this. Losing that wakeup would strand the task forever, so `resume()` and
// the waker callbacks cooperate through this state machine rather than
// resubmitting blindly.
const IDLE: u8 = 0; // frame parked in `frame`, nobody polling it
const POLLING: u8 = 1; // a `resume()` call owns the frame right now
const REPOLL: u8 = 2; // woken while polling; the current `resume()` must poll again
const DONE: u8 = 3; // frame has produced `Poll::Ready`

struct TaskInner {
    frame: Mutex<Option<BoxedFuture>>,
    state: AtomicU8,
}

/// A cloneable handle to a suspended computation.
///
/// Constructing a task with [`spawn`] does not run any of its body; the
/// first [`Task::resume`] call performs the first `poll`. A task's frame
/// stays addressable — `done()` keeps answering — until every clone of the
/// handle is dropped.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

/// Constructs a suspended task from a future. No part of `fut` runs until
/// the returned task is resumed for the first time.
pub fn spawn(fut: impl Future<Output = ()> + Send + 'static) -> Task {
    Task {
        inner: Arc::new(TaskInner {
            frame: Mutex::new(Some(Box::pin(fut))),
            state: AtomicU8::new(IDLE),
        }),
    }
}

impl Task {
    /// Reports whether the task has run to completion.
    pub fn done(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == DONE
    }

    /// Runs the task to its next suspension point or to completion.
    ///
    /// Returns `true` if this call actually drove the frame (possibly more
    /// than once, if it was woken while polling), `false` if the task was
    /// already done or another `resume()` already owns the frame.
    pub fn resume(&self) -> bool {
        if self
            .inner
            .state
            .compare_exchange(IDLE, POLLING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        loop {
            let mut frame = {
                let mut slot = self
                    .inner
                    .frame
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                slot.take().expect("polling task must still have a frame")
            };

            let waker = self.clone().into_waker();
            let mut cx = Context::from_waker(&waker);

            // The core's public API never returns a `Result`; a panicking
            // task must not take its worker thread down with it. The
            // failure is still made visible via the trace log instead of
            // vanishing outright — the swallow-at-the-boundary contract is
            // unchanged, only its observability improves.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| frame.as_mut().poll(&mut cx)));

            match outcome {
                Ok(Poll::Ready(())) => {
                    self.inner.state.store(DONE, Ordering::Release);
                    return true;
                }
                Err(panic_payload) => {
                    tracing::error!(
                        "task panicked while polling; swallowing per scheduler contract"
                    );
                    drop(panic_payload);
                    self.inner.state.store(DONE, Ordering::Release);
                    return true;
                }
                Ok(Poll::Pending) => {
                    *self
                        .inner
                        .frame
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(frame);

                    match self.inner.state.compare_exchange(
                        POLLING,
                        IDLE,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => return true,
                        // A wake fired while we were polling (possibly the
                        // poll call we just made, via `yield_now`). Poll
                        // again immediately instead of resubmitting, since
                        // nobody else will: the waker saw `POLLING` and
                        // deferred to us.
                        Err(_) => {
                            self.inner.state.store(POLLING, Ordering::Release);
                            continue;
                        }
                    }
                }
            }
        }
    }

    fn into_waker(self) -> Waker {
        let raw = task_into_raw_waker(self.inner);
        // Safety: `TASK_WAKER_VTABLE`'s four functions implement the
        // `RawWaker` contract: the data pointer is always a live
        // `Arc<TaskInner>` produced by `Arc::into_raw` in either
        // `task_into_raw_waker` or `waker_clone`, and `wake`/`wake_by_ref`/
        // `drop` each consume exactly the reference count they were handed.
        unsafe { Waker::from_raw(raw) }
    }
}

fn task_into_raw_waker(inner: Arc<TaskInner>) -> RawWaker {
    let ptr = Arc::into_raw(inner).cast::<()>();
    RawWaker::new(ptr, &TASK_WAKER_VTABLE)
}

static TASK_WAKER_VTABLE: RawWakerVTable =
    RawWakerVTable::new(waker_clone, waker_wake, waker_wake_by_ref, waker_drop);

unsafe fn waker_clone(ptr: *const ()) -> RawWaker {
    // Safety: `ptr` originates from `Arc::into_raw::<TaskInner>` (see
    // `task_into_raw_waker`); the `RawWaker` contract guarantees this
    // function only runs while that allocation is still alive.
    let inner = unsafe { Arc::from_raw(ptr.cast::<TaskInner>()) };
    let cloned = inner.clone();
    std::mem::forget(inner);
    RawWaker::new(Arc::into_raw(cloned).cast::<()>(), &TASK_WAKER_VTABLE)
}

unsafe fn waker_wake(ptr: *const ()) {
    // Safety: see `waker_clone`; this call consumes the reference count it
    // is handed, matching `Waker::wake`'s by-value contract.
    let inner = unsafe { Arc::from_raw(ptr.cast::<TaskInner>()) };
    wake_inner(inner);
}

unsafe fn waker_wake_by_ref(ptr: *const ()) {
    // Safety: see `waker_clone`; this call borrows, so the reference count
    // is restored before returning.
    let inner = unsafe { Arc::from_raw(ptr.cast::<TaskInner>()) };
    wake_inner(inner.clone());
    std::mem::forget(inner);
}

unsafe fn waker_drop(ptr: *const ()) {
    // Safety: see `waker_clone`; this drops the reference count it is
    // handed, matching `Waker`'s `Drop` contract.
    drop(unsafe { Arc::from_raw(ptr.cast::<TaskInner>()) });
}

/// Routes a wakeup to either an in-progress poll (by flagging it for a
/// repoll) or a parked task (by resubmitting it), never both.
fn wake_inner(inner: Arc<TaskInner>) {
    loop {
        match inner.state.load(Ordering::Acquire) {
            DONE => return,
            POLLING => {
                match inner.state.compare_exchange(
                    POLLING,
                    REPOLL,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return,
                    Err(_) => continue,
                }
            }
            IDLE => {
                match inner.state.compare_exchange(
                    IDLE,
                    POLLING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        TaskManager::execute(Task { inner });
                        return;
                    }
                    Err(_) => continue,
                }
            }
            REPOLL => return, // already queued for a repoll by someone else
            _ => unreachable!("invalid task state"),
        }
    }
}

/// The sentinel "unconditional yield" future. Its only observable effect
/// is re-submitting the current task to the task manager; polling it twice
/// in a row always resolves on the second call.
pub struct Yield {
    yielded: bool,
}

/// Returns the sentinel yield awaitable described in the scheduling model:
/// the only way user code can voluntarily hand its worker back to the pool
/// without going through the mutex.
pub fn yield_now() -> Yield {
    Yield { yielded: false }
}

impl Future for Yield {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
