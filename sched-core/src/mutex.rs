//! A suspension-based async mutex: on contention it parks the calling task
//! in a lock-free wait queue instead of blocking the worker thread that
//! polls it.

use std::cell::UnsafeCell;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

use crate::queue::Queue;

/// An async mutex guarding a `T`.
///
/// `T = ()` recovers the bare ownership gate this type is modeled on
/// (`locked()`/`lock()`/`unlock()` with no payload); most callers use the
/// guard to also carry the protected data, RAII-style, the way
/// `std::sync::Mutex<T>` does.
pub struct AsyncMutex<T> {
    locked: AtomicBool,
    wait_queue: Queue<Waker>,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is always mediated by `AsyncMutexGuard`, which
// exists only while `locked` is held by the guard's owner; the mutex itself
// never hands out two live guards at once (see `AsyncMutex::lock`).
unsafe impl<T: Send> Send for AsyncMutex<T> {}
// Safety: see the `Send` impl — shared access across threads only ever
// reaches `data` through a uniquely-held guard.
unsafe impl<T: Send> Sync for AsyncMutex<T> {}

impl<T> AsyncMutex<T> {
    /// Creates a new, unlocked mutex guarding `value`.
    pub fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            wait_queue: Queue::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Advisory, racy inspection of the held flag. Useful for tests; never
    /// load-bearing for correctness.
    pub fn locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Attempts to acquire the mutex immediately, returning an [`Awaiter`]
    /// that is either already satisfied (the caller acquired it) or parked
    /// on first poll (someone else held it).
    ///
    /// The acquisition attempt itself happens here, synchronously, not on
    /// first poll: `lock()` already knows whether the caller must suspend
    /// by the time it returns.
    pub fn lock(&self) -> Awaiter<'_, T> {
        let acquired = self.try_acquire();
        Awaiter {
            mutex: self,
            acquired,
            parked: false,
        }
    }

    /// Releases the mutex, transferring ownership directly to the head of
    /// the wait queue if one exists, or clearing the held flag otherwise.
    ///
    /// Calling this on a mutex that is not held is a contract violation;
    /// tests do not exercise it and the source leaves the behaviour
    /// unspecified, so this only `debug_assert`s rather than panicking in
    /// release builds.
    pub fn unlock(&self) {
        debug_assert!(
            self.locked.load(Ordering::Acquire),
            "unlock() called on a mutex that is not locked"
        );

        match self.wait_queue.dequeue() {
            Some(waker) => {
                // `locked` stays `true`: the token passes straight to the
                // waiter without an intervening unlocked window.
                waker.wake();
            }
            None => {
                self.locked.store(false, Ordering::Release);
            }
        }
    }

    fn try_acquire(&self) -> bool {
        loop {
            match self.locked.compare_exchange_weak(
                false,
                true,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(true) => return false,
                Err(_) => continue, // spurious CAS failure, previous value unreadable yet
            }
        }
    }
}

/// The object returned by [`AsyncMutex::lock`]. Resolves to an
/// [`AsyncMutexGuard`], either immediately (the caller acquired the mutex)
/// or after parking on the mutex's wait queue until a matching `unlock()`
/// hands ownership over.
pub struct Awaiter<'a, T> {
    mutex: &'a AsyncMutex<T>,
    acquired: bool,
    parked: bool,
}

impl<'a, T> Future for Awaiter<'a, T> {
    type Output = AsyncMutexGuard<'a, T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.acquired {
            return Poll::Ready(AsyncMutexGuard { mutex: self.mutex });
        }

        if !self.parked {
            self.parked = true;
            self.mutex.wait_queue.enqueue(cx.waker().clone());
            return Poll::Pending;
        }

        // We were parked and have now been woken: `unlock()` only wakes
        // the continuation it just handed the token to, so by the time we
        // are polled again the mutex is ours.
        Poll::Ready(AsyncMutexGuard { mutex: self.mutex })
    }
}

/// RAII guard for an [`AsyncMutex`]. Dereferences to the protected `T`;
/// dropping it releases the mutex via the same path as calling
/// [`AsyncMutexGuard::unlock`] explicitly.
pub struct AsyncMutexGuard<'a, T> {
    mutex: &'a AsyncMutex<T>,
}

impl<'a, T> AsyncMutexGuard<'a, T> {
    /// Releases the mutex. Equivalent to dropping the guard, but available
    /// for callers that want the release to happen at a specific point
    /// rather than at end of scope.
    pub fn unlock(self) {
        let mutex = self.mutex;
        std::mem::forget(self);
        mutex.unlock();
    }
}

impl<'a, T> Deref for AsyncMutexGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: this guard is the unique token for the critical section
        // (see `AsyncMutex::lock`/`unlock`'s ownership-transfer invariant),
        // so no other reference to `data` can exist while it is alive.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for AsyncMutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: see `Deref::deref`.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for AsyncMutexGuard<'a, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}
