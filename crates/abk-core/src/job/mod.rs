//! Job model: discrete leaves, composite trees, optional progress.
//!
//! A [`Job`] is either a discrete leaf handed to a [`JobExecutor`] or a
//! [`CompositeJob`] whose executable work is exactly its transitive discrete
//! descendants. Progress, cancellation and retry settings are an optional
//! capability ([`JobProgress`]); jobs without it run once with no delay.

mod executor;
mod progress;

pub use executor::JobExecutor;
pub use progress::{JobProgress, ProgressChanged};

use std::sync::Arc;

/// A leaf job. Implemented by the caller's concrete job types.
pub trait DiscreteJob: Send + Sync + 'static {
    fn description(&self) -> String;

    /// Progress/cancellation/retry capability, if this job supports it.
    fn progress(&self) -> Option<&JobProgress> {
        None
    }
}

/// A job made of child jobs (discrete or composite). Never executed itself.
pub struct CompositeJob<D> {
    description: String,
    children: Vec<Job<D>>,
    progress: Option<Arc<JobProgress>>,
}

impl<D> CompositeJob<D> {
    pub fn new(description: impl Into<String>, children: Vec<Job<D>>) -> Self {
        Self {
            description: description.into(),
            children,
            progress: None,
        }
    }

    /// Attach aggregate progress (and with it a cancellation signal).
    pub fn with_progress(mut self, progress: Arc<JobProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Children in declaration order (execution order is not guaranteed).
    pub fn children(&self) -> &[Job<D>] {
        &self.children
    }

    pub fn progress(&self) -> Option<&JobProgress> {
        self.progress.as_deref()
    }

    /// Shared handle to the aggregate progress, for observers.
    pub fn progress_handle(&self) -> Option<Arc<JobProgress>> {
        self.progress.clone()
    }
}

/// A unit of declared work.
pub enum Job<D> {
    Discrete(Arc<D>),
    Composite(Arc<CompositeJob<D>>),
}

impl<D> Clone for Job<D> {
    fn clone(&self) -> Self {
        match self {
            Job::Discrete(job) => Job::Discrete(Arc::clone(job)),
            Job::Composite(job) => Job::Composite(Arc::clone(job)),
        }
    }
}

impl<D: DiscreteJob> Job<D> {
    pub fn discrete(job: D) -> Self {
        Job::Discrete(Arc::new(job))
    }

    pub fn composite(job: CompositeJob<D>) -> Self {
        Job::Composite(Arc::new(job))
    }

    pub fn description(&self) -> String {
        match self {
            Job::Discrete(job) => job.description(),
            Job::Composite(job) => job.description().to_string(),
        }
    }

    pub fn progress(&self) -> Option<&JobProgress> {
        match self {
            Job::Discrete(job) => job.progress(),
            Job::Composite(job) => job.progress(),
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeJob<D>> {
        match self {
            Job::Composite(job) => Some(job),
            Job::Discrete(_) => None,
        }
    }

    /// Every discrete job under this one (itself, if it is discrete).
    pub fn leaves(&self) -> Vec<Arc<D>> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(job) = stack.pop() {
            match job {
                Job::Discrete(leaf) => out.push(leaf),
                Job::Composite(composite) => {
                    stack.extend(composite.children.iter().rev().cloned());
                }
            }
        }
        out
    }
}

impl<D: DiscreteJob> std::fmt::Debug for Job<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Job::Discrete(job) => f
                .debug_tuple("Discrete")
                .field(&job.description())
                .finish(),
            Job::Composite(job) => f
                .debug_struct("Composite")
                .field("description", &job.description)
                .field("children", &job.children)
                .finish(),
        }
    }
}
