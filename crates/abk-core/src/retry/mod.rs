//! Retry policy for discrete jobs.
//!
//! The policy comes from the job's optional progress capability: its attempt
//! budget (at least one) and the fixed delay between attempts. Jobs without
//! the capability get a single attempt and no delay.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
