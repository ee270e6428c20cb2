use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collection::QueueOrder;

/// Retry parameters applied to planned copy jobs (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per file (including the first).
    pub max_attempts: u32,
    /// Delay in seconds between attempts.
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 5,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// One source → target backup mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Global configuration loaded from `~/.config/abk/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbkConfig {
    /// Maximum number of files copied concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Dispatch order of pending copies: "fifo" (default), "lifo" or "unordered".
    #[serde(default)]
    pub queue_order: QueueOrder,
    /// Decimal digits kept on every progress update.
    #[serde(default = "default_progress_precision")]
    pub progress_precision: u32,
    /// How often paused workers re-check whether dispatch resumed, in milliseconds.
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Compare SHA-256 of source and target after each copy.
    #[serde(default)]
    pub verify_checksums: bool,
    /// Copy buffer size in bytes.
    #[serde(default = "default_buffer_bytes")]
    pub buffer_bytes: usize,
    /// Persisted backup mappings, run in order by `abk run`.
    #[serde(default)]
    pub mappings: Vec<PathMapping>,
}

fn default_max_concurrency() -> usize {
    4
}

fn default_progress_precision() -> u32 {
    4
}

fn default_pause_poll_ms() -> u64 {
    1000
}

fn default_buffer_bytes() -> usize {
    64 * 1024
}

impl Default for AbkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            queue_order: QueueOrder::default(),
            progress_precision: default_progress_precision(),
            pause_poll_ms: default_pause_poll_ms(),
            retry: None,
            verify_checksums: false,
            buffer_bytes: default_buffer_bytes(),
            mappings: Vec::new(),
        }
    }
}

impl AbkConfig {
    /// Retry section, or the built-in defaults when absent.
    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("abk")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AbkConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<AbkConfig> {
    if !path.exists() {
        let default_cfg = AbkConfig::default();
        save_at(path, &default_cfg)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AbkConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Write configuration (including mappings) back to the default path.
pub fn save(cfg: &AbkConfig) -> Result<()> {
    save_at(&config_path()?, cfg)
}

/// The configuration as it would be written to disk.
pub fn render(cfg: &AbkConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

pub fn save_at(path: &Path, cfg: &AbkConfig) -> Result<()> {
    let toml = render(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
