//! Reload Module
//!
//! Pushes "something changed" to connected browsers.
//!
//! # Architecture
//!
//! ```text
//! FsActor --notify()--> FanOut --ReloadSignal--> connection threads --"refresh"--> Browser
//!                   \-> PollFlag <--GET /__livereload-- Browser   (poll mode)
//! ```
//!
//! # Modules
//!
//! - `fanout` - Subscriber set and point-in-time broadcast
//! - `poll` - Single-bit staleness flag for the polling variant
//! - `server` - WebSocket listener holding reload connections

pub mod fanout;
pub mod poll;
pub mod server;

pub use fanout::FanOut;
pub use poll::PollFlag;
pub use server::ReloadServer;

/// Downstream of the change coalescer.
///
/// Called once per debounced burst; carries no detail about what changed.
pub trait Notify: Send + Sync {
    fn notify(&self);
}

/// The message the fan-out hands to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSignal {
    /// Monotonic per fan-out, for log correlation only
    pub seq: u64,
}
