//! The scheduler handle: submission, inlining, pause/resume, inspection.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::collection::{ConcurrentCollection, QueueOrder};
use crate::config::AbkConfig;
use crate::error::{Error, Result};

use super::budget::WorkerBudget;
use super::item::{WorkHandle, WorkId, WorkItem};
use super::worker;

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);

/// Construction parameters for a [`BoundedScheduler`].
#[derive(Debug, Clone, Copy)]
pub struct WorkSettings {
    /// Maximum items executing at once; must be at least 1.
    pub max_concurrency: usize,
    /// Order in which pending items are dispatched.
    pub order: QueueOrder,
    /// How long a worker sleeps before re-checking while dispatch is paused.
    pub pause_poll: Duration,
}

impl Default for WorkSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            order: QueueOrder::Fifo,
            pause_poll: Duration::from_secs(1),
        }
    }
}

impl From<&AbkConfig> for WorkSettings {
    fn from(cfg: &AbkConfig) -> Self {
        Self {
            max_concurrency: cfg.max_concurrency,
            order: cfg.queue_order,
            pause_poll: Duration::from_millis(cfg.pause_poll_ms),
        }
    }
}

/// Diagnostic view of a pending item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWork {
    pub id: WorkId,
    pub label: String,
}

pub(super) struct Shared {
    pub(super) id: u64,
    pub(super) pending: ConcurrentCollection<WorkItem>,
    pub(super) workers: WorkerBudget,
    pub(super) paused: AtomicBool,
    pub(super) pause_poll: Duration,
}

/// Runs submitted work on at most `max_concurrency` tokio tasks at a time.
///
/// Cheap to clone; clones share the same pending list and worker budget.
/// Each instance is independent of every other.
#[derive(Clone)]
pub struct BoundedScheduler {
    shared: Arc<Shared>,
}

impl BoundedScheduler {
    /// FIFO scheduler with the default pause poll interval.
    pub fn new(max_concurrency: usize) -> Result<Self> {
        Self::with_settings(WorkSettings {
            max_concurrency,
            ..WorkSettings::default()
        })
    }

    pub fn with_settings(settings: WorkSettings) -> Result<Self> {
        Self::with_pending(
            settings,
            ConcurrentCollection::with_discipline(settings.order.discipline()),
        )
    }

    /// Use a caller-built pending collection (its discipline decides dispatch order).
    pub fn with_pending(
        settings: WorkSettings,
        pending: ConcurrentCollection<WorkItem>,
    ) -> Result<Self> {
        if settings.max_concurrency < 1 {
            return Err(Error::InvalidArgument(format!(
                "max_concurrency must be at least 1, got {}",
                settings.max_concurrency
            )));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
                pending,
                workers: WorkerBudget::new(settings.max_concurrency),
                paused: AtomicBool::new(false),
                pause_poll: settings.pause_poll,
            }),
        })
    }

    pub fn max_concurrency(&self) -> usize {
        self.shared.workers.max()
    }

    /// Worker loops currently alive (idle loops exit, so this drops to 0).
    pub fn active_workers(&self) -> usize {
        self.shared.workers.active()
    }

    /// Items not yet dispatched; excludes items currently executing.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Queue an item and start another worker loop if under the ceiling.
    ///
    /// Must be called from inside a tokio runtime; otherwise `Unavailable`
    /// and the item is not queued.
    pub fn submit(&self, item: WorkItem) -> Result<WorkId> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::Unavailable("no tokio runtime to run workers on".to_string())
        })?;
        let id = item.id();
        let label = item.label().to_string();

        let start_worker = self.shared.pending.with_lock(|items| {
            items.push(item);
            self.shared.workers.try_acquire()
        });

        tracing::trace!(
            scheduler = self.shared.id,
            work = %id,
            label = %label,
            "work submitted"
        );
        if start_worker {
            runtime.spawn(worker::run(Arc::clone(&self.shared)));
        }
        Ok(id)
    }

    /// Submit a future and get a handle to its output.
    pub fn spawn<F, T>(&self, label: impl Into<String>, future: F) -> Result<WorkHandle<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (item, handle) = WorkItem::with_handle(label, future);
        self.submit(item)?;
        Ok(handle)
    }

    /// True when called from work running on this scheduler.
    pub fn is_current_worker(&self) -> bool {
        worker::current_scheduler()
            .map(|id| id == self.shared.id)
            .unwrap_or(false)
    }

    /// Run an item that was never queued right here, if the caller is one of
    /// this scheduler's workers. Otherwise the item is handed back untouched.
    pub async fn try_inline(&self, item: WorkItem) -> std::result::Result<(), WorkItem> {
        if !self.is_current_worker() {
            return Err(item);
        }
        tracing::debug!(
            scheduler = self.shared.id,
            work = %item.id(),
            "running work inline"
        );
        item.into_future().await;
        Ok(())
    }

    /// Pull a queued item out of the pending list and run it here, bypassing
    /// dispatch order. Returns false if the caller is not one of this
    /// scheduler's workers or the item was already dispatched.
    pub async fn try_inline_queued(&self, id: WorkId) -> bool {
        if !self.is_current_worker() {
            return false;
        }
        let Some(item) = self.shared.pending.remove_where(|item| item.id() == id) else {
            return false;
        };
        tracing::debug!(
            scheduler = self.shared.id,
            work = %id,
            "running queued work inline"
        );
        item.into_future().await;
        true
    }

    /// Stop starting new items. Running items are unaffected.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
        tracing::info!(scheduler = self.shared.id, "dispatch paused");
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
        tracing::info!(scheduler = self.shared.id, "dispatch resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Ids and labels of pending items, without blocking on the pending lock.
    pub fn pending_snapshot(&self) -> Result<Vec<PendingWork>> {
        self.shared.pending.snapshot_map(|item| PendingWork {
            id: item.id(),
            label: item.label().to_string(),
        })
    }
}

impl std::fmt::Debug for BoundedScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedScheduler")
            .field("id", &self.shared.id)
            .field("max_concurrency", &self.shared.workers.max())
            .field("active_workers", &self.shared.workers.active())
            .field("paused", &self.is_paused())
            .finish()
    }
}
