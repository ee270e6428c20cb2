//! Turn path mappings into job trees.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::{AbkConfig, PathMapping};
use crate::job::{CompositeJob, Job, JobProgress};

use super::job::{ByteTally, FileCopyJob};

/// Progress and retry parameters given to every planned job.
#[derive(Debug, Clone, Copy)]
pub struct PlanSettings {
    pub precision: u32,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self::from(&AbkConfig::default())
    }
}

impl From<&AbkConfig> for PlanSettings {
    fn from(cfg: &AbkConfig) -> Self {
        let retry = cfg.retry_or_default();
        Self {
            precision: cfg.progress_precision,
            max_attempts: retry.max_attempts,
            retry_delay: retry.delay(),
        }
    }
}

impl PlanSettings {
    fn progress(&self, cancel: CancellationToken) -> JobProgress {
        JobProgress::new()
            .with_precision(self.precision)
            .with_retry(self.max_attempts, self.retry_delay)
            .with_cancellation(cancel)
    }
}

enum Entry {
    File { path: PathBuf, size: u64 },
    Dir { path: PathBuf, entries: Vec<Entry>, total: u64 },
}

impl Entry {
    fn size(&self) -> u64 {
        match self {
            Entry::File { size, .. } => *size,
            Entry::Dir { total, .. } => *total,
        }
    }
}

fn scan(path: &Path) -> Result<Entry> {
    let meta = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?;
    if meta.is_file() {
        return Ok(Entry::File {
            path: path.to_path_buf(),
            size: meta.len(),
        });
    }
    if !meta.is_dir() {
        anyhow::bail!("{} is neither a file nor a directory", path.display());
    }
    scan_dir(path)
}

/// Below the mapping root, symlinks are not followed.
fn scan_dir(path: &Path) -> Result<Entry> {
    let mut children: Vec<PathBuf> = fs::read_dir(path)
        .with_context(|| format!("list {}", path.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("list {}", path.display()))?;
    children.sort();

    let mut entries = Vec::with_capacity(children.len());
    for child in children {
        let meta = fs::symlink_metadata(&child)
            .with_context(|| format!("stat {}", child.display()))?;
        if meta.is_file() {
            entries.push(Entry::File {
                size: meta.len(),
                path: child,
            });
        } else if meta.is_dir() {
            entries.push(scan_dir(&child)?);
        } else if meta.file_type().is_symlink() {
            tracing::debug!(path = %child.display(), "skipping symlink");
        } else {
            tracing::debug!(path = %child.display(), "skipping special file");
        }
    }
    let total = entries.iter().map(Entry::size).sum();
    Ok(Entry::Dir {
        path: path.to_path_buf(),
        entries,
        total,
    })
}

fn build(
    entry: Entry,
    target: PathBuf,
    settings: &PlanSettings,
    cancel: &CancellationToken,
    ancestors: &[Arc<ByteTally>],
) -> Job<FileCopyJob> {
    match entry {
        Entry::File { path, size } => {
            let progress = settings.progress(cancel.child_token());
            let job = FileCopyJob::new(path, target, size, progress);
            Job::discrete(job.with_ancestors(ancestors.to_vec()))
        }
        Entry::Dir { path, entries, .. } if entries.is_empty() => {
            let progress = settings.progress(cancel.child_token());
            let job = FileCopyJob::directory(path, target, progress);
            Job::discrete(job.with_ancestors(ancestors.to_vec()))
        }
        Entry::Dir {
            path,
            entries,
            total,
        } => {
            let token = cancel.child_token();
            let progress = Arc::new(settings.progress(token.clone()));
            let mut chain = ancestors.to_vec();
            chain.push(Arc::new(ByteTally::new(total, Arc::clone(&progress))));

            let children = entries
                .into_iter()
                .map(|child| {
                    let child_target = match &child {
                        Entry::File { path, .. } | Entry::Dir { path, .. } => {
                            target.join(path.file_name().unwrap_or(path.as_os_str()))
                        }
                    };
                    build(child, child_target, settings, &token, &chain)
                })
                .collect();
            let description = format!(
                "Backup: [{}] to [{}]",
                path.display(),
                target.display()
            );
            let job = CompositeJob::new(description, children).with_progress(progress);
            Job::composite(job)
        }
    }
}

/// Plan one mapping: a file becomes a discrete copy job, a directory a tree.
///
/// Every planned job's cancellation token is a descendant of `cancel`.
pub fn plan_mapping(
    mapping: &PathMapping,
    settings: &PlanSettings,
    cancel: &CancellationToken,
) -> Result<Job<FileCopyJob>> {
    let entry = scan(&mapping.source)?;
    Ok(build(entry, mapping.target.clone(), settings, cancel, &[]))
}

/// Plan several mappings under one root job whose progress covers all bytes.
pub fn plan_mappings(
    mappings: &[PathMapping],
    settings: &PlanSettings,
    cancel: &CancellationToken,
) -> Result<Job<FileCopyJob>> {
    let entries = mappings
        .iter()
        .map(|m| scan(&m.source))
        .collect::<Result<Vec<_>>>()?;
    let total = entries.iter().map(Entry::size).sum();

    let progress = Arc::new(settings.progress(cancel.clone()));
    let root = [Arc::new(ByteTally::new(total, Arc::clone(&progress)))];
    let children = entries
        .into_iter()
        .zip(mappings)
        .map(|(entry, m)| {
            let target = m.target.clone();
            build(entry, target, settings, cancel, &root)
        })
        .collect();
    let description = format!("Backup: {} mapping(s)", mappings.len());
    let job = CompositeJob::new(description, children).with_progress(progress);
    Ok(Job::composite(job))
}
