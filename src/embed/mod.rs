//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Reload client scripts (websocket and polling flavours)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{RELOAD_WS_JS, ReloadWsVars};
//!
//! let tag = RELOAD_WS_JS.inline_tag(&ReloadWsVars { port: 35729, sentinel: "refresh".into() });
//! ```

mod template;

pub use template::{Template, TemplateVars, js_string};

pub mod serve {
    use std::sync::Arc;

    use super::{Template, TemplateVars, js_string};
    use crate::config::{DevConfig, ReloadMode};
    use crate::reload::poll::POLL_PATH;

    /// Variables for livereload.js (websocket client).
    pub struct ReloadWsVars {
        pub port: u16,
        pub sentinel: String,
    }

    impl TemplateVars for ReloadWsVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__LIVERELOAD_PORT__", &self.port.to_string())
                .replace("__LIVERELOAD_SENTINEL__", &js_string(&self.sentinel))
        }
    }

    /// Websocket reload client.
    pub const RELOAD_WS_JS: Template<ReloadWsVars> =
        Template::new(include_str!("serve/livereload.js"));

    /// Variables for livepoll.js (polling client).
    pub struct ReloadPollVars {
        pub path: &'static str,
        pub interval_ms: u64,
    }

    impl TemplateVars for ReloadPollVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__LIVERELOAD_PATH__", &js_string(self.path))
                .replace("__LIVERELOAD_INTERVAL__", &self.interval_ms.to_string())
        }
    }

    /// Polling reload client.
    pub const RELOAD_POLL_JS: Template<ReloadPollVars> =
        Template::new(include_str!("serve/livepoll.js"));

    /// Render the `<script>` tag prepended to every HTML response.
    ///
    /// `ws_port` is the port the reload listener actually bound.
    pub fn injected_script(config: &DevConfig, ws_port: u16) -> Arc<str> {
        let tag = match config.reload.mode {
            ReloadMode::Websocket => RELOAD_WS_JS.inline_tag(&ReloadWsVars {
                port: ws_port,
                sentinel: config.reload.sentinel.clone(),
            }),
            ReloadMode::Poll => RELOAD_POLL_JS.inline_tag(&ReloadPollVars {
                path: POLL_PATH,
                interval_ms: config.reload.poll_interval_ms,
            }),
        };
        Arc::from(tag)
    }

}
