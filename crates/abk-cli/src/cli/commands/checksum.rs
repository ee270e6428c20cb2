//! `abk checksum`: SHA-256 of a file.

use abk_core::checksum;
use anyhow::Result;
use std::path::Path;

pub async fn run_checksum(path: &Path) -> Result<()> {
    let owned = path.to_path_buf();
    let task = tokio::task::spawn_blocking(move || checksum::sha256_path(&owned));
    let digest = task.await??;
    println!("{}  {}", digest, path.display());
    Ok(())
}
