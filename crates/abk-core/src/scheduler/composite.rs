use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::job::{CompositeJob, DiscreteJob, JobExecutor};

use super::JobScheduler;

impl<D, E> JobScheduler<D, E>
where
    D: DiscreteJob,
    E: JobExecutor<D>,
{
    /// Schedule every child concurrently and wait for all of them.
    ///
    /// A failing child never stops its siblings. Once all children are done,
    /// a set cancellation signal wins over any failures; otherwise failures are
    /// reported as one `PartialFailure`.
    pub(super) async fn schedule_composite(&self, job: Arc<CompositeJob<D>>) -> Result<()> {
        let description = job.description().to_string();
        match job.progress() {
            Some(progress) => progress.initialize(),
            None => {
                tracing::info!(
                    job = %description,
                    "composite job does not support progress"
                );
            }
        }

        let total = job.children().len();
        let mut children = JoinSet::new();
        for child in job.children() {
            children.spawn(self.schedule_job(child.clone()));
        }

        let mut failed = 0usize;
        while let Some(joined) = children.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::debug!(job = %description, error = %e, "child job failed");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        job = %description,
                        error = %e,
                        "child job task panicked"
                    );
                }
            }
        }

        if job.progress().is_some_and(|p| p.is_cancelled()) {
            tracing::info!(job = %description, "composite job cancelled");
            return Err(Error::Cancelled { description });
        }

        if failed > 0 {
            tracing::warn!(
                job = %description,
                failed,
                total,
                "composite job finished with failures"
            );
            return Err(Error::PartialFailure {
                description,
                failed,
                total,
            });
        }

        tracing::debug!(job = %description, total, "composite job completed");
        Ok(())
    }
}
