use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::job::{DiscreteJob, JobProgress};

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    done as f64 / total as f64
}

/// Running byte count for a directory job; drives that job's progress.
///
/// Count and progress update happen under one lock so concurrent files
/// cannot publish a stale fraction after a newer one.
#[derive(Debug)]
pub struct ByteTally {
    total: u64,
    done: Mutex<u64>,
    progress: Arc<JobProgress>,
}

impl ByteTally {
    pub fn new(total: u64, progress: Arc<JobProgress>) -> Self {
        Self {
            total,
            done: Mutex::new(0),
            progress,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn done(&self) -> u64 {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, n: u64) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done = done.saturating_add(n);
        self.progress.update(fraction(*done, self.total));
    }

    fn sub(&self, n: u64) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done = done.saturating_sub(n);
        self.progress.update(fraction(*done, self.total));
    }
}

/// Copy one file; progress is bytes copied over the size seen at planning time.
///
/// An empty source directory is planned as a directory job of size 0: running
/// it only creates the target directory.
#[derive(Debug)]
pub struct FileCopyJob {
    source: PathBuf,
    target: PathBuf,
    directory: bool,
    size: u64,
    copied: AtomicU64,
    progress: JobProgress,
    ancestors: Vec<Arc<ByteTally>>,
}

impl FileCopyJob {
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        size: u64,
        progress: JobProgress,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            directory: false,
            size,
            copied: AtomicU64::new(0),
            progress,
            ancestors: Vec::new(),
        }
    }

    /// Recreate an empty directory at `target`.
    pub fn directory(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        progress: JobProgress,
    ) -> Self {
        Self {
            directory: true,
            ..Self::new(source, target, 0, progress)
        }
    }

    /// Directory tallies (outermost first) that should see this file's bytes.
    pub fn with_ancestors(mut self, ancestors: Vec<Arc<ByteTally>>) -> Self {
        self.ancestors = ancestors;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }

    pub fn file_size(&self) -> u64 {
        self.size
    }

    pub fn progress_bytes(&self) -> u64 {
        self.copied.load(Ordering::Acquire)
    }

    /// Record `n` more bytes copied. The total never exceeds the file size.
    ///
    /// Ancestors republish their fraction on every call, so a zero-byte update
    /// still marks directories holding only empty entries complete.
    pub fn update_byte_count(&self, n: u64) {
        let size = self.size;
        let prev = match self
            .copied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some(c.saturating_add(n).min(size))
            }) {
            Ok(prev) | Err(prev) => prev,
        };
        let now = prev.saturating_add(n).min(size);
        let delta = now - prev;
        for tally in &self.ancestors {
            tally.add(delta);
        }
        self.progress.update(fraction(now, size));
    }

    /// Forget bytes counted by a previous attempt (also in the ancestors).
    pub fn reset_bytes(&self) {
        let prev = self.copied.swap(0, Ordering::AcqRel);
        if prev > 0 {
            for tally in &self.ancestors {
                tally.sub(prev);
            }
        }
    }
}

impl DiscreteJob for FileCopyJob {
    fn description(&self) -> String {
        format!(
            "Copy: [{}] to [{}]",
            self.source.display(),
            self.target.display()
        )
    }

    fn progress(&self) -> Option<&JobProgress> {
        Some(&self.progress)
    }
}
