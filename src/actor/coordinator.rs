//! Actor Coordinator
//!
//! Runs the [`FsActor`] on the actor runtime, bridges the process-wide
//! shutdown signal into it, and escalates a watcher failure to a
//! process failure.

use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::{Receiver, TryRecvError};

use super::fs::FsActor;

/// How often the shutdown channel is checked
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Coordinator - owns the watcher actor for the life of the server.
pub struct Coordinator {
    fs: FsActor,
    /// Optional shutdown signal receiver
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn new(fs: FsActor) -> Self {
        Self {
            fs,
            shutdown_rx: None,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run until shutdown. A watcher error is fatal for the whole server.
    pub async fn run(self) -> Result<()> {
        crate::debug!("actor"; "start");
        let result = match self.shutdown_rx {
            Some(rx) => self.fs.run(wait_for_signal(rx)).await,
            None => self.fs.run(std::future::pending()).await,
        };

        match result {
            Ok(()) => {
                crate::debug!("actor"; "stopped");
                Ok(())
            }
            Err(e) => {
                let detail = format!("{:#}", anyhow::Error::from(e));
                crate::logger::status_error("live reload stopped", &detail);
                crate::core::fail(detail.clone());
                Err(anyhow::anyhow!(detail))
            }
        }
    }
}

/// Resolve once the shutdown channel fires (or its sender is gone).
async fn wait_for_signal(rx: Receiver<()>) {
    loop {
        match rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                crate::debug!("actor"; "shutdown signal received");
                return;
            }
            Err(TryRecvError::Empty) => tokio::time::sleep(SHUTDOWN_POLL).await,
        }
    }
}
