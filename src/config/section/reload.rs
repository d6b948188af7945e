//! `[reload]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [reload]
//! mode = "websocket"          # "websocket" (push) or "poll"
//! port = 35729                # WebSocket listener port
//! debounce_ms = 50            # Quiet period before a burst fires
//! sentinel = "refresh"        # Text frame that tells the page to reload
//! poll_interval_ms = 500      # Poll period of the injected script (poll mode)
//! ```

use serde::Deserialize;

use crate::actor::fs::DEFAULT_DEBOUNCE_MS;

/// How the browser learns about changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    /// Server pushes the sentinel over a dedicated WebSocket port.
    #[default]
    Websocket,
    /// Page polls `/__livereload` on the HTTP port.
    Poll,
}

/// Live reload settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    pub mode: ReloadMode,

    /// WebSocket port (websocket mode only).
    pub port: u16,

    /// Debounce window in milliseconds.
    pub debounce_ms: u64,

    /// Message sent to connected pages on reload.
    pub sentinel: String,

    /// Poll period in milliseconds (poll mode only).
    pub poll_interval_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            mode: ReloadMode::Websocket,
            port: 35729,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            sentinel: "refresh".into(),
            poll_interval_ms: 500,
        }
    }
}
