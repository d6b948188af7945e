//! Configuration section definitions.
//!
//! Each module corresponds to a section in `html-dev.toml`:
//!
//! | Module   | TOML Section | Purpose                               |
//! |----------|--------------|---------------------------------------|
//! | `serve`  | `[serve]`    | HTTP interface, port, index, workers  |
//! | `reload` | `[reload]`   | Reload mode, channel port, debounce   |
//! | `watch`  | `[watch]`    | Watcher filtering                     |

mod reload;
mod serve;
mod watch;

pub use reload::{ReloadConfig, ReloadMode};
pub use serve::ServeConfig;
pub use watch::WatchConfig;
