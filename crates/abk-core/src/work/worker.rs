//! Worker loop: drain pending items until none remain, then exit.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::pool::Shared;

tokio::task_local! {
    static CURRENT_SCHEDULER: u64;
}

/// Id of the scheduler whose work is running in the current task, if any.
pub(super) fn current_scheduler() -> Option<u64> {
    CURRENT_SCHEDULER.try_with(|id| *id).ok()
}

/// One worker loop. The caller has already taken a slot in `shared.workers`;
/// the loop gives it back (under the pending lock) when it finds nothing to do.
pub(super) async fn run(shared: Arc<Shared>) {
    tracing::debug!(scheduler = shared.id, "worker started");
    loop {
        if shared.paused.load(Ordering::Acquire) {
            tokio::time::sleep(shared.pause_poll).await;
            continue;
        }

        let next = shared.pending.with_lock(|items| {
            let item = items.pop();
            if item.is_none() {
                shared.workers.release();
            }
            item
        });
        let Some(item) = next else {
            break;
        };

        let id = item.id();
        let label = item.label().to_string();
        // Own task per item so a panic cannot take the loop (and its slot) down.
        let task = tokio::spawn(CURRENT_SCHEDULER.scope(shared.id, item.into_future()));
        if let Err(e) = task.await {
            tracing::warn!(
                scheduler = shared.id,
                work = %id,
                label = %label,
                error = %e,
                "work item panicked"
            );
        }
    }
    tracing::debug!(scheduler = shared.id, "worker stopped");
}
