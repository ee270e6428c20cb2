//! Thread-safe queue-like container over a pluggable ordering discipline.
//!
//! Callers only see enqueue/dequeue/peek (single and batch, sync and async);
//! whether the items come back FIFO, LIFO or in no particular order is decided
//! once, at construction, by the injected [`Discipline`].

mod discipline;
mod wrapper;

pub use discipline::{Discipline, Fifo, Lifo, QueueOrder, Unordered};
pub use wrapper::ConcurrentCollection;
