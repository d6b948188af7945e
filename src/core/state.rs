//! Lifecycle state for the dev server.
//!
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C or a fatal watcher error)
//! - `FAILURE`: Why the process is stopping, when it is not a clean Ctrl+C

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tiny_http::Server;

/// Shutdown has been requested
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Reason recorded by [`fail`]; turned into a non-zero exit by `main`
static FAILURE: Mutex<Option<String>> = Mutex::new(None);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown signal sender for actor system
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether a server has been registered:
/// - Before `register_server()`: Sets SHUTDOWN flag, process exits immediately
/// - After `register_server()`: Graceful shutdown (unblock server, notify actors)
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if SERVER.get().is_some() {
            crate::log!("serve"; "shutting down...");
            request_shutdown();
        } else {
            SHUTDOWN.store(true, Ordering::SeqCst);
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the request loop
pub fn register_server(server: Arc<Server>, shutdown_tx: crossbeam::channel::Sender<()>) {
    let _ = SERVER.set(server);
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering: a worker may see the flag one poll late
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Stop the whole process because a background component cannot continue.
///
/// The first reason wins; later calls only re-trigger shutdown.
pub fn fail(reason: impl Into<String>) {
    record_failure(reason.into());
    request_shutdown();
}

/// Take the reason recorded by [`fail`], if any.
pub fn take_failure() -> Option<String> {
    FAILURE.lock().take()
}

fn record_failure(reason: String) {
    let mut slot = FAILURE.lock();
    if slot.is_none() {
        *slot = Some(reason);
    }
}

fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);

    // Notify actor system
    if let Some(tx) = SHUTDOWN_TX.get() {
        let _ = tx.send(());
    }

    // Unblock HTTP request loop
    if let Some(server) = SERVER.get() {
        server.unblock();
    }
}
