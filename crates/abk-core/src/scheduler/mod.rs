//! Job scheduler: walks a job tree, runs leaves on a bounded work scheduler,
//! retries failed leaves and aggregates failures of composite jobs.
//!
//! Composite children fan out on ordinary tokio tasks (unbounded); only leaf
//! execution goes through the [`BoundedScheduler`], so at most
//! `max_concurrency` executor calls run at once however wide the tree is.

mod composite;
mod discrete;

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::job::{DiscreteJob, Job, JobExecutor};
use crate::work::BoundedScheduler;

/// Future returned by [`JobScheduler::schedule_job`].
pub type ScheduleFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Schedules jobs of leaf type `D` onto executor `E`.
///
/// Cheap to clone; clones share the executor and the work scheduler.
pub struct JobScheduler<D, E> {
    executor: Arc<E>,
    work: BoundedScheduler,
    _job: PhantomData<fn(D)>,
}

impl<D, E> Clone for JobScheduler<D, E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            work: self.work.clone(),
            _job: PhantomData,
        }
    }
}

impl<D, E> JobScheduler<D, E>
where
    D: DiscreteJob,
    E: JobExecutor<D>,
{
    pub fn new(executor: E, work: BoundedScheduler) -> Self {
        Self::with_shared_executor(Arc::new(executor), work)
    }

    pub fn with_shared_executor(executor: Arc<E>, work: BoundedScheduler) -> Self {
        Self {
            executor,
            work,
            _job: PhantomData,
        }
    }

    /// The work scheduler leaf attempts run on (for pause/resume and inspection).
    pub fn work_scheduler(&self) -> &BoundedScheduler {
        &self.work
    }

    /// Run `job` to completion: composite jobs fan out over their children,
    /// discrete jobs go to the executor with retries.
    pub fn schedule_job(&self, job: Job<D>) -> ScheduleFuture {
        let this = self.clone();
        Box::pin(async move {
            match job {
                Job::Composite(composite) => this.schedule_composite(composite).await,
                discrete @ Job::Discrete(_) => this.schedule_discrete(discrete).await,
            }
        })
    }
}

#[cfg(test)]
mod tests;
