//! Viewer configuration module.
//!
//! Handles loading and validating `config.toml`. Stock defaults are the base
//! layer; a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! cache_dir = "/tmp/comic"  # Page cache directory (default: <temp>/comic)
//!
//! [viewer]
//! window = [800, 600]       # Window size pages are fitted into
//!
//! [timing]
//! debounce_ms = 200         # Quiet time before a page is shown
//! wait_ms = 1000            # How long to wait for the first page
//!
//! [processing]
//! max_processes = 4         # Max cache writers (omit for auto = CPU cores)
//! ```
//!
//! The `--cache-dir` flag overrides `cache_dir`. Unknown keys are rejected to
//! catch typos early.

use crate::imaging::Size;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Viewer configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Page cache directory. `None` means `<temp>/comic`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Display settings.
    pub viewer: WindowConfig,
    /// Debounce and wait timing.
    pub timing: TimingConfig,
    /// Parallel cache population settings.
    pub processing: ProcessingConfig,
}

impl ViewerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewer.window[0] == 0 || self.viewer.window[1] == 0 {
            return Err(ConfigError::Validation(
                "viewer.window values must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Cache directory to open.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("comic"))
    }
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Window size as `[width, height]` in pixels.
    pub window: [u32; 2],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { window: [800, 600] }
    }
}

impl WindowConfig {
    pub fn size(&self) -> Size {
        Size::from((self.window[0], self.window[1]))
    }
}

/// Debounce and wait timing, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Navigation keys pressed within this window collapse into one redraw.
    pub debounce_ms: u64,
    /// Upper bound on waiting for the scan to deliver a first page.
    pub wait_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            wait_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of threads writing pages into the cache.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ViewerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables are merged key-by-key; any other overlay value replaces the base.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load the config file at `path` on top of stock defaults and validate it.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: ViewerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Comic Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding the page cache (pages.redb). Pages read from archives
# and folders are stored here so later visits skip the decompression.
# Defaults to a "comic" directory under the system temp dir.
# cache_dir = "/tmp/comic"

# ---------------------------------------------------------------------------
# Display
# ---------------------------------------------------------------------------
[viewer]
# Window size as [width, height]. Pages are scaled to fit inside it,
# keeping their aspect ratio.
window = [800, 600]

# ---------------------------------------------------------------------------
# Timing
# ---------------------------------------------------------------------------
[timing]
# Quiet time in milliseconds before the current page is shown. Paging
# quickly through a book only renders the page you stop on.
debounce_ms = 200

# How long to wait in milliseconds for the scan to find a first page
# before showing the waiting placeholder.
wait_ms = 1000

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of threads copying pages into the cache.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
