//! Error taxonomy shared by the collection, work scheduler and job scheduler.

/// Errors raised by the scheduling core.
///
/// Execution failures from a [`JobExecutor`](crate::job::JobExecutor) never appear
/// here directly: they are retried and only surface as [`Error::ExhaustedRetries`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: a missing item, a concurrency ceiling below 1.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation needs at least one item and the collection is empty.
    #[error("collection is empty")]
    EmptyCollection,

    /// A non-blocking operation could not take its lock, or no async runtime is running.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A composite job was handed to the discrete (leaf-only) path.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The job's cancellation signal was observed.
    #[error("job [{description}] was cancelled")]
    Cancelled { description: String },

    /// A discrete job failed on every permitted attempt.
    #[error("aborted discrete job [{description}]: failed to complete after {attempts} attempts (last error: {last_error})")]
    ExhaustedRetries {
        description: String,
        attempts: u32,
        last_error: String,
    },

    /// A composite job finished with one or more failing children.
    #[error("composite job [{description}]: {failed} out of {total} child jobs failed")]
    PartialFailure {
        description: String,
        failed: usize,
        total: usize,
    },

    /// A submitted work item was dropped or panicked before it produced a result.
    #[error("work item [{label}] was abandoned before completing")]
    Abandoned { label: String },
}

impl Error {
    /// True for the cancellation variant; used by the CLI to pick an exit message.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_message_has_counts() {
        let e = Error::PartialFailure {
            description: "docs".into(),
            failed: 1,
            total: 3,
        };
        assert_eq!(
            e.to_string(),
            "composite job [docs]: 1 out of 3 child jobs failed"
        );
    }

    #[test]
    fn exhausted_retries_names_last_failure() {
        let e = Error::ExhaustedRetries {
            description: "copy".into(),
            attempts: 2,
            last_error: "disk full".into(),
        };
        assert!(e.to_string().contains("after 2 attempts"));
        assert!(e.to_string().ends_with("(last error: disk full)"));
        assert!(!e.is_cancelled());
    }
}
