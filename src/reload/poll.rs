//! Polling variant of the reload channel.
//!
//! One staleness bit: set on change, cleared by the next poll that reads it.
//! With several tabs open only the first poller after a change sees it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::Notify;

/// HTTP path the injected poll script asks.
pub const POLL_PATH: &str = "/__livereload";

#[derive(Debug, Clone, Default)]
pub struct PollFlag {
    stale: Arc<AtomicBool>,
}

impl PollFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether anything changed since the last call, and clears the bit.
    pub fn take(&self) -> bool {
        self.stale.swap(false, Ordering::AcqRel)
    }
}

impl Notify for PollFlag {
    fn notify(&self) {
        self.stale.store(true, Ordering::Release);
        crate::logger::status_success("changed, waiting for next poll");
    }
}
