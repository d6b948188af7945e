//! Dev server configuration for `html-dev.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── reload     # [reload]
//! │   ├── serve      # [serve]
//! │   └── watch      # [watch]
//! ├── error          # ConfigError
//! └── mod.rs         # DevConfig (this file)
//! ```
//!
//! Precedence is CLI flag, then config file, then built-in default. The
//! config file is optional.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{ReloadConfig, ReloadMode, ServeConfig, WatchConfig};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::cli::Cli;
use crate::log;
use crate::utils::path::{expand_path, normalize_path};

/// Config file looked up inside the served directory when `--config` is absent
pub const DEFAULT_CONFIG_NAME: &str = "html-dev.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing html-dev.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevConfig {
    /// Absolute path of the served and watched directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Config file that was read, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub reload: ReloadConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

impl DevConfig {
    /// Load configuration from CLI arguments.
    ///
    /// The root comes from `--dir` (tilde expanded, made absolute). The config
    /// file is `--config` if given, which must then exist, else
    /// `html-dev.toml` inside the root if present.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(PathBuf::from("."), e))?;
        let root = normalize_path(&expand_path(&cli.dir, &cwd));
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory(root).into());
        }

        let config_path = match &cli.config {
            Some(path) => Some(expand_path(path, &cwd)),
            None => Some(root.join(DEFAULT_CONFIG_NAME)).filter(|p| p.is_file()),
        };

        let mut config = match &config_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        config.root = root;
        config.config_path = config_path;
        config.apply_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply CLI flags on top of file values.
    fn apply_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.serve.port, cli.port.as_ref());
        Self::update_option(&mut self.serve.interface, cli.host.as_ref());
        Self::update_option(&mut self.reload.port, cli.reload_port.as_ref());
        if cli.poll {
            self.reload.mode = ReloadMode::Poll;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check cross-field constraints. Collects every problem before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.serve.index.trim().is_empty() {
            problems.push("serve.index must not be empty".to_owned());
        } else if self.serve.index.contains(['/', '\\']) {
            problems.push(format!(
                "serve.index `{}` must be a file name, not a path",
                self.serve.index
            ));
        }
        if self.serve.workers == 0 {
            problems.push("serve.workers must be at least 1".to_owned());
        }
        if self.reload.debounce_ms == 0 {
            problems.push("reload.debounce_ms must be at least 1".to_owned());
        }

        match self.reload.mode {
            ReloadMode::Websocket => {
                if self.reload.sentinel.is_empty() {
                    problems.push("reload.sentinel must not be empty".to_owned());
                }
                if self.reload.port != 0 && self.reload.port == self.serve.port {
                    problems.push(format!(
                        "reload.port and serve.port are both {}",
                        self.serve.port
                    ));
                }
            }
            ReloadMode::Poll => {
                if self.reload.poll_interval_ms == 0 {
                    problems.push("reload.poll_interval_ms must be at least 1".to_owned());
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> DevConfig {
    let (parsed, ignored) = DevConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
