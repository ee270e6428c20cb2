//! Count of running worker loops, capped at the scheduler's ceiling.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Worker slots for one scheduler. Loops take a slot before they start and give
/// it back when they find the pending list empty.
///
/// Mutated only while the pending collection's lock is held, so "queue empty"
/// and "release slot" happen together; reads are lock-free.
#[derive(Debug)]
pub struct WorkerBudget {
    max: usize,
    active: AtomicUsize,
}

impl WorkerBudget {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            active: AtomicUsize::new(0),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Worker loops currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Take a slot if one is free. Returns whether a new worker may start.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.active.load(Ordering::Relaxed);
        loop {
            if current >= self.max {
                return false;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Give a slot back.
    pub fn release(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |n| n.checked_sub(1));
    }
}
