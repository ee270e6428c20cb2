//! `abk config`: show where the config lives and what it contains.

use abk_core::config::{self, AbkConfig};
use anyhow::Result;

pub fn run_config(cfg: &AbkConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", config::render(cfg)?);
    Ok(())
}
