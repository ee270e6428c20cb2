//! Bounded-concurrency work scheduler.
//!
//! Work items wait in a [`ConcurrentCollection`](crate::collection::ConcurrentCollection);
//! at most `max_concurrency` worker loops drain it. Workers exit as soon as
//! nothing is pending, and the next submission starts a fresh one.

mod budget;
mod item;
mod pool;
mod worker;

pub use budget::WorkerBudget;
pub use item::{WorkHandle, WorkId, WorkItem};
pub use pool::{BoundedScheduler, PendingWork, WorkSettings};
