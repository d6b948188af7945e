//! FileSystem Actor
//!
//! Watches the served root and turns bursts of change events into a single
//! reload notification.
//!
//! Architecture:
//! ```text
//! notify callback → std channel → bridge thread → Debouncer (timing) → Notify
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::DevConfig;
use crate::reload::Notify;

// Pure timing and noise filtering.
mod debouncer;
// Shared fs event types.
mod types;

#[cfg(test)]
mod tests;

use debouncer::Debouncer;
pub use debouncer::DEFAULT_DEBOUNCE_MS;
pub use types::{ChangeEvent, ChangeKind};

/// Buffer between the notify bridge thread and the actor task
const EVENT_BUFFER: usize = 64;

/// Watcher failures. All of them end live reload; none are retried here.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create file watcher")]
    Create(#[source] notify::Error),

    #[error("failed to watch `{}`", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("file watcher error")]
    Backend(#[source] notify::Error),

    #[error("watched root `{}` was removed", .0.display())]
    RootRemoved(PathBuf),

    #[error("file watcher stopped delivering events")]
    Disconnected,
}

/// FileSystem Actor - watches the root and drives the debouncer
pub struct FsActor {
    /// Channel to receive notify events (sync side)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    root: PathBuf,
    debouncer: Debouncer,
    /// Downstream of the debouncer
    notifier: Arc<dyn Notify>,
}

impl FsActor {
    /// Create the watcher and attach it to the root immediately.
    ///
    /// Events buffer in the channel until [`FsActor::run`] starts, so nothing
    /// between startup and the first poll is lost.
    pub fn new(config: &DevConfig, notifier: Arc<dyn Notify>) -> Result<Self, WatchError> {
        // notify doesn't support async, bridge through a sync channel
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .map_err(WatchError::Create)?;

        let root = config.root.clone();
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: root.clone(),
                source,
            })?;

        let debouncer = Debouncer::new(
            Duration::from_millis(config.reload.debounce_ms),
            config.watch.ignore_temp_files,
        );

        Ok(Self {
            notify_rx,
            watcher,
            root,
            debouncer,
            notifier,
        })
    }

    /// Run the actor event loop until `shutdown` resolves or the watcher fails.
    pub async fn run<F>(self, shutdown: F) -> Result<(), WatchError>
    where
        F: Future<Output = ()>,
    {
        let notify_rx = self.notify_rx;
        // Dropping the watcher closes the bridge, so keep it until we return
        let _watcher = self.watcher;

        let (async_tx, async_rx) = mpsc::channel(EVENT_BUFFER);

        // Spawn a thread to forward notify events into the async channel
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                if async_tx.blocking_send(result).is_err() {
                    break; // Receiver dropped
                }
            }
        });

        crate::log!("watch"; "watching {}", self.root.display());
        drive(async_rx, self.debouncer, self.notifier, self.root, shutdown).await
    }
}

/// Current time on tokio's clock, so a paused test clock drives the debouncer too.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// The coalescing loop: feed events in, fire one notification per quiet period.
async fn drive<F>(
    mut events: mpsc::Receiver<notify::Result<notify::Event>>,
    mut debouncer: Debouncer,
    notifier: Arc<dyn Notify>,
    root: PathBuf,
    shutdown: F,
) -> Result<(), WatchError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let sleep = debouncer.sleep_duration(now());

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                crate::debug!("watch"; "shutting down");
                return Ok(());
            }
            received = events.recv() => {
                let Some(result) = received else {
                    return Err(WatchError::Disconnected);
                };
                let event = ChangeEvent::from(result.map_err(WatchError::Backend)?);

                // A rename of the root shows up as a modify, not a remove
                if !event.kind.is_access() && !root.is_dir() {
                    return Err(WatchError::RootRemoved(root));
                }

                if debouncer.on_event(&event, now()) {
                    crate::logger::log_fs_event(&event);
                }
            }
            _ = tokio::time::sleep(sleep), if debouncer.is_pending() => {
                if let Some(coalesced) = debouncer.fire_if_ready(now()) {
                    crate::debug!("watch"; "{} event(s) over {} path(s) coalesced",
                        coalesced.events, coalesced.paths.len());
                    notifier.notify();
                }
            }
        }
    }
}
