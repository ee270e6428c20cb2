//! File-copy backup jobs.
//!
//! A path mapping is planned into a job tree (directories become composite
//! jobs, files become [`FileCopyJob`]s) and executed by [`CopyExecutor`].
//! Directory jobs report aggregate progress by bytes copied underneath them.

mod executor;
mod job;
mod plan;

pub use executor::CopyExecutor;
pub use job::{ByteTally, FileCopyJob};
pub use plan::{plan_mapping, plan_mappings, PlanSettings};
