use std::sync::Arc;

use async_trait::async_trait;

/// Runs one discrete job. Supplied by the host application.
///
/// The scheduler only looks at whether the future resolves to `Ok` or `Err`;
/// errors are retried according to the job's progress settings.
#[async_trait]
pub trait JobExecutor<D>: Send + Sync + 'static {
    async fn execute(&self, job: Arc<D>) -> anyhow::Result<()>;
}
