use std::sync::Arc;

use crate::error::{Error, Result};
use crate::job::{DiscreteJob, Job, JobExecutor};
use crate::retry::{run_with_retry, RetryPolicy};

use super::JobScheduler;

impl<D, E> JobScheduler<D, E>
where
    D: DiscreteJob,
    E: JobExecutor<D>,
{
    /// Run a leaf job through the executor, retrying per its progress settings.
    ///
    /// Leaf-only: a composite job fails with `InvalidState`.
    pub async fn schedule_discrete(&self, job: Job<D>) -> Result<()> {
        let job = match job {
            Job::Discrete(job) => job,
            Job::Composite(composite) => {
                return Err(Error::InvalidState(format!(
                    "composite job [{}] cannot be scheduled as a discrete job",
                    composite.description()
                )));
            }
        };

        let description = job.description();
        let progress = job.progress();
        if progress.is_none() {
            tracing::info!(job = %description, "job does not support progress");
        }
        let policy = RetryPolicy::for_job(progress);
        let cancel = progress.map(|p| p.cancellation());

        run_with_retry(&policy, cancel, &description, |attempt| {
            if let Some(progress) = job.progress() {
                progress.initialize();
            }
            let executor = Arc::clone(&self.executor);
            let leaf = Arc::clone(&job);
            let submitted = self.work.spawn(
                format!("{description} (attempt {attempt})"),
                async move { executor.execute(leaf).await },
            );
            async move {
                match submitted {
                    Ok(handle) => handle.wait().await.unwrap_or_else(|e| Err(e.into())),
                    Err(e) => Err(e.into()),
                }
            }
        })
        .await?;

        tracing::debug!(job = %description, "discrete job completed");
        Ok(())
    }
}
