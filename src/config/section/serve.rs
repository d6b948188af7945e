//! `[serve]` section configuration.
//!
//! Contains HTTP server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "0.0.0.0"       # Network interface (127.0.0.1 = localhost only)
//! port = 3000                 # HTTP port number
//! index = "index.html"        # Document served for directory requests
//! workers = 4                 # Request handler threads
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `0.0.0.0` (default): all interfaces (LAN accessible)
    /// - `127.0.0.1`: localhost only
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Index document appended to directory paths.
    pub index: String,

    /// Size of the request handler pool.
    pub workers: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            index: "index.html".into(),
            workers: 4,
        }
    }
}
