//! Named cancellation handles for running backups.
//!
//! Every registered token is a child of one root token, so `cancel_all`
//! (used on Ctrl-C) reaches every job tree at once.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct JobControl {
    root: CancellationToken,
    jobs: RwLock<HashMap<String, CancellationToken>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backup by name; returns the token to plan its jobs with.
    /// Re-registering a name replaces the previous token.
    pub fn register(&self, name: impl Into<String>) -> CancellationToken {
        let token = self.root.child_token();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), token.clone());
        token
    }

    /// Cancel one backup. Returns false if no backup has that name.
    pub fn cancel(&self, name: &str) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            Some(token) => {
                tracing::info!(name, "cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        tracing::info!("cancelling all backups");
        self.root.cancel();
    }

    pub fn unregister(&self, name: &str) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_targets_one_name() {
        let control = JobControl::new();
        let a = control.register("a");
        let b = control.register("b");
        assert!(control.cancel("a"));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
    }

    #[test]
    fn cancel_unknown_name_is_false() {
        let control = JobControl::new();
        assert!(!control.cancel("nothing"));
    }

    #[test]
    fn cancel_all_reaches_every_token() {
        let control = JobControl::new();
        let a = control.register("a");
        let b = control.register("b");
        let nested = b.child_token();
        control.cancel_all();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(nested.is_cancelled());
    }

    #[test]
    fn unregister_forgets_name() {
        let control = JobControl::new();
        let _token = control.register("a");
        assert!(control.is_registered("a"));
        control.unregister("a");
        assert!(!control.is_registered("a"));
        assert!(!control.cancel("a"));
    }
}
