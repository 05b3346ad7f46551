//! A fixed-size bank of independent atomic counters, one per producer, plus
//! a running total. Grounded on `atomic-multiple-counter.{h,cpp}`: each
//! producer increments its own slot so contention on the counters
//! themselves never competes with contention on the mutex under test.

use std::sync::atomic::{AtomicI64, Ordering};

/// `N` independent `i64` counters, each touched by a single producer.
pub struct AtomicMultipleCounter {
    counters: Vec<AtomicI64>,
}

impl AtomicMultipleCounter {
    pub fn new(counter_count: usize) -> Self {
        Self {
            counters: (0..counter_count).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    pub fn increment(&self, counter_index: usize) {
        match self.counters.get(counter_index) {
            Some(counter) => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            None => tracing::error!(
                counter_index,
                counters = self.counters.len(),
                "increment on out-of-range counter index"
            ),
        }
    }

    pub fn get(&self, counter_index: usize) -> i64 {
        match self.counters.get(counter_index) {
            Some(counter) => counter.load(Ordering::Relaxed),
            None => {
                tracing::error!(
                    counter_index,
                    counters = self.counters.len(),
                    "get on out-of-range counter index"
                );
                0
            }
        }
    }

    pub fn get_total(&self) -> i64 {
        self.counters.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn size(&self) -> usize {
        self.counters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_are_isolated_per_slot() {
        let counters = AtomicMultipleCounter::new(3);
        counters.increment(0);
        counters.increment(0);
        counters.increment(2);
        assert_eq!(counters.get(0), 2);
        assert_eq!(counters.get(1), 0);
        assert_eq!(counters.get(2), 1);
        assert_eq!(counters.get_total(), 3);
    }

    #[test]
    fn out_of_range_access_is_a_logged_no_op() {
        let counters = AtomicMultipleCounter::new(1);
        counters.increment(5);
        assert_eq!(counters.get(5), 0);
        assert_eq!(counters.get_total(), 0);
    }
}
