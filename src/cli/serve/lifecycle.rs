//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Result, anyhow};
use crossbeam::channel::Receiver;
use tiny_http::Server;

use crate::actor::{Coordinator, fs::FsActor};
use crate::log;

/// Bind the HTTP server. A busy port is fatal; there is no fallback port.
pub fn bind(interface: IpAddr, port: u16) -> Result<(Server, SocketAddr)> {
    let requested = SocketAddr::new(interface, port);
    let server = Server::http(requested)
        .map_err(|e| anyhow!("failed to bind HTTP server on {requested}: {e}"))?;
    let addr = server.server_addr().to_ip().unwrap_or(requested);
    Ok((server, addr))
}

/// Spawn the actor system for file watching on its own runtime thread.
pub fn spawn_actors(fs: FsActor, shutdown_rx: Receiver<()>) -> JoinHandle<()> {
    thread::spawn(move || run_actor_system(fs, shutdown_rx))
}

fn run_actor_system(fs: FsActor, shutdown_rx: Receiver<()>) {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log!("actor"; "failed to create tokio runtime: {}", e);
            crate::core::fail(format!("failed to create tokio runtime: {e}"));
            return;
        }
    };

    rt.block_on(async {
        let coordinator = Coordinator::new(fs).with_shutdown_signal(shutdown_rx);
        if let Err(e) = coordinator.run().await {
            log!("actor"; "error: {}", e);
        }
    });
}

/// Wait for actor system to shutdown gracefully (max 2 seconds).
pub fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
