//! `[watch]` section configuration.
//!
//! ```toml
//! [watch]
//! ignore_temp_files = true    # Skip editor swap/backup files (*.swp, *~, .#*)
//! ```

use serde::Deserialize;

/// File watcher settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Drop events whose paths are all editor temp files.
    pub ignore_temp_files: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore_temp_files: true,
        }
    }
}
