//! CLI command handlers, one file per command.

mod checksum;
mod config;
mod map;
mod run;

pub use checksum::run_checksum;
pub use config::run_config;
pub use map::{run_map_add, run_map_list, run_map_remove};
pub use run::{run_copy, run_mappings};
