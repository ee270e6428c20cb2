//! Lock-guarded wrapper exposing queue operations over any [`Discipline`].

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use crate::error::{Error, Result};

use super::discipline::{Discipline, Fifo, Lifo, QueueOrder, Unordered};

/// Thread-safe queue-like collection.
///
/// Every operation holds one mutex for its full duration. Consumers blocked in
/// [`dequeue_timeout`](Self::dequeue_timeout) are woken whenever a batch lands.
///
/// Items are passed as `impl Into<Option<T>>` so that a bare `T` is accepted
/// while a `None` is rejected with [`Error::InvalidArgument`].
pub struct ConcurrentCollection<T> {
    items: Mutex<Box<dyn Discipline<T>>>,
    available: Condvar,
}

impl<T: Send + 'static> ConcurrentCollection<T> {
    pub fn new(order: QueueOrder) -> Self {
        Self::with_discipline(order.discipline())
    }

    pub fn fifo() -> Self {
        Self::with_discipline(Box::new(Fifo::default()))
    }

    pub fn lifo() -> Self {
        Self::with_discipline(Box::new(Lifo::default()))
    }

    pub fn unordered() -> Self {
        Self::with_discipline(Box::new(Unordered::default()))
    }
}

impl<T> ConcurrentCollection<T> {
    /// Wrap a caller-supplied discipline (must start empty or hold valid items).
    pub fn with_discipline(discipline: Box<dyn Discipline<T>>) -> Self {
        Self {
            items: Mutex::new(discipline),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Discipline<T>>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Add one item. `None` fails with `InvalidArgument` and changes nothing.
    pub fn enqueue<I: Into<Option<T>>>(&self, item: I) -> Result<()> {
        self.enqueue_batch(std::iter::once(item))
    }

    /// Add a batch atomically: if any entry is `None`, nothing is admitted.
    /// An empty batch is a no-op.
    pub fn enqueue_batch<B, I>(&self, batch: B) -> Result<()>
    where
        B: IntoIterator<Item = I>,
        I: Into<Option<T>>,
    {
        let items: Option<Vec<T>> = batch.into_iter().map(Into::into).collect();
        let Some(items) = items else {
            return Err(Error::InvalidArgument(
                "cannot enqueue a missing item".to_string(),
            ));
        };
        if items.is_empty() {
            return Ok(());
        }

        let mut guard = self.lock();
        for item in items {
            guard.push(item);
        }
        drop(guard);
        self.available.notify_all();
        Ok(())
    }

    /// Remove the next item, or `EmptyCollection`.
    pub fn dequeue(&self) -> Result<T> {
        self.lock().pop().ok_or(Error::EmptyCollection)
    }

    /// Remove up to `max_count` items. Never fails; may return fewer (or none).
    pub fn dequeue_batch(&self, max_count: usize) -> Vec<T> {
        let mut guard = self.lock();
        let mut batch = Vec::with_capacity(max_count.min(guard.len()));
        while batch.len() < max_count {
            match guard.pop() {
                Some(item) => batch.push(item),
                None => break,
            }
        }
        batch
    }

    /// Block the calling thread until an item is available or `timeout` elapses.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        let guard = self.lock();
        let (mut guard, _) = self
            .available
            .wait_timeout_while(guard, timeout, |items| items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        guard.pop()
    }

    /// Remove the first item matching `pred`, wherever it sits.
    pub fn remove_where<F>(&self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.lock().remove_first(&mut pred)
    }

    /// Run `f` with the lock held. Used by the work scheduler so that its
    /// worker bookkeeping and the pending items share one critical section.
    pub(crate) fn with_lock<R>(&self, f: impl FnOnce(&mut dyn Discipline<T>) -> R) -> R {
        let mut guard = self.lock();
        f(&mut **guard)
    }

    /// Map every item under a non-blocking lock attempt.
    ///
    /// Fails with `Unavailable` instead of waiting when the lock is held elsewhere.
    pub fn snapshot_map<R, F>(&self, mut f: F) -> Result<Vec<R>>
    where
        F: FnMut(&T) -> R,
    {
        let guard = match self.items.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Err(Error::Unavailable(
                    "collection lock is held elsewhere".to_string(),
                ))
            }
        };
        let mut out = Vec::with_capacity(guard.len());
        guard.for_each(&mut |item| out.push(f(item)));
        Ok(out)
    }
}

impl<T: Clone> ConcurrentCollection<T> {
    /// Copy of the next item without removing it, or `EmptyCollection`.
    pub fn peek(&self) -> Result<T> {
        self.lock().peek().cloned().ok_or(Error::EmptyCollection)
    }

    /// Copy of all items in iteration order (non-blocking, see [`Self::snapshot_map`]).
    pub fn snapshot(&self) -> Result<Vec<T>> {
        self.snapshot_map(T::clone)
    }
}

// Async forms run the blocking operation in place on the current worker thread.
// They panic on a current-thread runtime: the host must have a worker to spare.
impl<T> ConcurrentCollection<T> {
    pub async fn enqueue_async<I: Into<Option<T>>>(&self, item: I) -> Result<()> {
        tokio::task::block_in_place(|| self.enqueue(item))
    }

    pub async fn enqueue_batch_async<B, I>(&self, batch: B) -> Result<()>
    where
        B: IntoIterator<Item = I>,
        I: Into<Option<T>>,
    {
        tokio::task::block_in_place(|| self.enqueue_batch(batch))
    }

    pub async fn dequeue_async(&self) -> Result<T> {
        tokio::task::block_in_place(|| self.dequeue())
    }

    pub async fn dequeue_batch_async(&self, max_count: usize) -> Vec<T> {
        tokio::task::block_in_place(|| self.dequeue_batch(max_count))
    }
}

impl<T: Clone> ConcurrentCollection<T> {
    pub async fn peek_async(&self) -> Result<T> {
        tokio::task::block_in_place(|| self.peek())
    }
}

impl<T: Send + 'static> Default for ConcurrentCollection<T> {
    fn default() -> Self {
        Self::fifo()
    }
}

impl<T> std::fmt::Debug for ConcurrentCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = match self.items.try_lock() {
            Ok(guard) => Some(guard.len()),
            Err(_) => None,
        };
        f.debug_struct("ConcurrentCollection")
            .field("len", &len)
            .finish()
    }
}
