//! Opaque units of asynchronous work and their completion handles.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;

use crate::error::{Error, Result};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

static NEXT_WORK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a work item; the only thing inlining needs to find it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkId(u64);

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A labelled future waiting to run on a [`BoundedScheduler`](super::BoundedScheduler).
pub struct WorkItem {
    id: WorkId,
    label: String,
    future: BoxFuture,
}

impl WorkItem {
    pub fn new<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: WorkId(NEXT_WORK_ID.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
            future: Box::pin(future),
        }
    }

    /// Wrap a future producing a value; the handle resolves once the item has run.
    pub fn with_handle<F, T>(label: impl Into<String>, future: F) -> (Self, WorkHandle<T>)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = oneshot::channel();
        let item = Self::new(label.clone(), async move {
            let _ = tx.send(future.await);
        });
        let handle = WorkHandle {
            id: item.id,
            label,
            rx,
        };
        (item, handle)
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn into_future(self) -> BoxFuture {
        self.future
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WorkItem {}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Completion handle for an item created with [`WorkItem::with_handle`].
#[derive(Debug)]
pub struct WorkHandle<T> {
    id: WorkId,
    label: String,
    rx: oneshot::Receiver<T>,
}

impl<T> WorkHandle<T> {
    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Wait for the item's output. `Abandoned` if it was dropped or panicked.
    pub async fn wait(self) -> Result<T> {
        let label = self.label;
        self.rx.await.map_err(|_| Error::Abandoned { label })
    }
}
