//! Streams a file to its backup location with `tokio::fs`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::checksum;
use crate::config::AbkConfig;
use crate::job::{DiscreteJob, JobExecutor};

use super::job::FileCopyJob;

/// Executes [`FileCopyJob`]s: chunked copy, byte progress, optional SHA-256 check.
#[derive(Debug, Clone)]
pub struct CopyExecutor {
    buffer_bytes: usize,
    verify: bool,
}

impl CopyExecutor {
    pub fn new(buffer_bytes: usize, verify: bool) -> Self {
        Self {
            buffer_bytes: buffer_bytes.max(1),
            verify,
        }
    }

    pub fn from_config(cfg: &AbkConfig) -> Self {
        Self::new(cfg.buffer_bytes, cfg.verify_checksums)
    }
}

#[async_trait]
impl JobExecutor<FileCopyJob> for CopyExecutor {
    async fn execute(&self, job: Arc<FileCopyJob>) -> Result<()> {
        job.reset_bytes();
        let source = job.source();
        let target = job.target();

        if job.is_directory() {
            tokio::fs::create_dir_all(target)
                .await
                .with_context(|| format!("create directory {}", target.display()))?;
            job.update_byte_count(0);
            tracing::debug!(target = %target.display(), "directory created");
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut reader = tokio::fs::File::open(source)
            .await
            .with_context(|| format!("open {}", source.display()))?;
        let mut writer = tokio::fs::File::create(target)
            .await
            .with_context(|| format!("create {}", target.display()))?;

        let mut buf = vec![0u8; self.buffer_bytes];
        loop {
            // The executor may stop early; the scheduler reports the cancellation.
            if job.progress().is_some_and(|p| p.is_cancelled()) {
                anyhow::bail!("copy of {} interrupted by cancellation", source.display());
            }
            let n = reader
                .read(&mut buf)
                .await
                .with_context(|| format!("read {}", source.display()))?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buf[..n])
                .await
                .with_context(|| format!("write {}", target.display()))?;
            job.update_byte_count(n as u64);
        }
        writer
            .flush()
            .await
            .with_context(|| format!("flush {}", target.display()))?;
        // Marks empty files complete.
        job.update_byte_count(0);

        if self.verify {
            let (src, dst) = (source.to_path_buf(), target.to_path_buf());
            let task = tokio::task::spawn_blocking(move || checksum::sha256_matches(&src, &dst));
            let matches = task.await.context("checksum task join")??;
            if !matches {
                anyhow::bail!(
                    "checksum mismatch between {} and {}",
                    source.display(),
                    target.display()
                );
            }
        }

        tracing::debug!(
            source = %source.display(),
            target = %target.display(),
            bytes = job.progress_bytes(),
            "file copied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobProgress;

    #[tokio::test]
    async fn copies_content_into_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.bin");
        let body: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();
        std::fs::write(&source, &body).unwrap();
        let target = dir.path().join("out").join("deep").join("a.bin");

        let job = Arc::new(FileCopyJob::new(
            &source,
            &target,
            body.len() as u64,
            JobProgress::new(),
        ));
        CopyExecutor::new(1024, true)
            .execute(Arc::clone(&job))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), body);
        assert_eq!(job.progress_bytes(), body.len() as u64);
        assert_eq!(job.progress().unwrap().percent_complete(), 100);
    }

    #[tokio::test]
    async fn empty_file_reaches_full_progress() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty");
        std::fs::write(&source, b"").unwrap();
        let job = Arc::new(FileCopyJob::new(
            &source,
            dir.path().join("copy"),
            0,
            JobProgress::new(),
        ));
        CopyExecutor::new(16, false)
            .execute(Arc::clone(&job))
            .await
            .unwrap();
        assert_eq!(job.progress().unwrap().progress(), 1.0);
    }

    #[tokio::test]
    async fn directory_job_creates_target_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("empty");
        let job = Arc::new(FileCopyJob::directory(
            dir.path(),
            &target,
            JobProgress::new(),
        ));
        CopyExecutor::new(16, false)
            .execute(Arc::clone(&job))
            .await
            .unwrap();
        assert!(target.is_dir());
        assert_eq!(job.progress().unwrap().progress(), 1.0);
    }

    #[tokio::test]
    async fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let job = Arc::new(FileCopyJob::new(
            dir.path().join("nope"),
            dir.path().join("copy"),
            3,
            JobProgress::new(),
        ));
        let err = CopyExecutor::new(16, false).execute(job).await.unwrap_err();
        assert!(format!("{err:#}").contains("open"));
    }

    #[tokio::test]
    async fn cancelled_job_stops_copying() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a");
        std::fs::write(&source, b"data").unwrap();
        let progress = JobProgress::new();
        progress.cancellation().cancel();
        let target = dir.path().join("b");
        let job = Arc::new(FileCopyJob::new(&source, target, 4, progress));
        let err = CopyExecutor::new(16, false).execute(job).await.unwrap_err();
        assert!(err.to_string().contains("cancellation"));
    }
}
