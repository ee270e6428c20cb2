//! Job scheduling core for AutoBackup: concurrent collections, a bounded
//! work scheduler, progress-tracked jobs with retry, and file-copy jobs.

pub mod checksum;
pub mod collection;
pub mod config;
pub mod control;
pub mod copy;
pub mod error;
pub mod job;
pub mod logging;
pub mod retry;
pub mod scheduler;
pub mod work;

pub use error::{Error, Result};
