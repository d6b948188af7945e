//! Actor System for Live Reload
//!
//! ```text
//! FsActor --> Notify (FanOut | PollFlag)
//! (watch)       (reload channel)
//! ```
//!
//! # Module Structure
//!
//! - `fs` - File system watcher with debouncing
//! - `coordinator` - Runs the watcher until shutdown or failure

pub mod coordinator;
pub mod fs;

pub use coordinator::Coordinator;
