//! `abk map`: edit the saved backup mappings.

use abk_core::config::{self, AbkConfig, PathMapping};
use anyhow::{bail, Result};
use std::path::PathBuf;

pub fn run_map_add(cfg: &mut AbkConfig, source: PathBuf, target: PathBuf) -> Result<()> {
    if !source.exists() {
        bail!("source {} does not exist", source.display());
    }
    println!(
        "mapping {}: {} -> {}",
        cfg.mappings.len(),
        source.display(),
        target.display()
    );
    cfg.mappings.push(PathMapping { source, target });
    config::save(cfg)
}

pub fn run_map_list(cfg: &AbkConfig) {
    if cfg.mappings.is_empty() {
        println!("no mappings");
        return;
    }
    for (i, m) in cfg.mappings.iter().enumerate() {
        let (source, target) = (m.source.display(), m.target.display());
        println!("{i:>3}  {source} -> {target}");
    }
}

pub fn run_map_remove(cfg: &mut AbkConfig, index: usize) -> Result<()> {
    if index >= cfg.mappings.len() {
        bail!(
            "no mapping at index {} ({} configured)",
            index,
            cfg.mappings.len()
        );
    }
    let removed = cfg.mappings.remove(index);
    println!(
        "removed {}: {} -> {}",
        index,
        removed.source.display(),
        removed.target.display()
    );
    config::save(cfg)
}
