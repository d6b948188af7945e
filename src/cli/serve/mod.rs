//! Development server: static files with the reload script injected.

mod inject;
mod lifecycle;
mod path;
mod response;

use path::{open_file, resolve_path};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;
use tiny_http::{Method, Request, Server};

use crate::actor::fs::FsActor;
use crate::config::DevConfig;
use crate::reload::PollFlag;
use crate::reload::poll::POLL_PATH;
use crate::{debug, log};

/// Everything a request handler needs; shared by all workers.
pub struct ServeContext {
    pub root: PathBuf,
    pub index: String,
    /// `<script>` tag prepended to every HTML response
    pub script: Arc<str>,
    /// Set in poll mode; answers `GET /__livereload`
    pub poll: Option<PollFlag>,
}

impl ServeContext {
    pub fn new(config: &DevConfig, script: Arc<str>, poll: Option<PollFlag>) -> Self {
        Self {
            root: config.root.clone(),
            index: config.serve.index.clone(),
            script,
            poll,
        }
    }
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server and register it for Ctrl+C shutdown.
pub fn bind_server(config: &DevConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    crate::core::register_server(Arc::clone(&server), shutdown_tx);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Start the watcher and run the request loop until shutdown (blocking).
    pub fn run(self, ctx: ServeContext, fs: FsActor, workers: usize) -> Result<()> {
        log!("serve"; "http://{}", self.addr);
        let actor_handle = lifecycle::spawn_actors(fs, self.shutdown_rx);
        let result = run_request_loop(&self.server, Arc::new(ctx), workers);
        lifecycle::wait_for_shutdown(actor_handle);
        result
    }
}

fn run_request_loop(server: &Server, ctx: Arc<ServeContext>, workers: usize) -> Result<()> {
    // Slow clients must not hold up other requests
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("http-{i}"))
        .build()?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(&ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                debug!("serve"; "request error: {:#}", e);
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, ctx: &ServeContext) -> Result<()> {
    if request.method() != &Method::Get {
        debug!("serve"; "{} {} -> 405", request.method(), request.url());
        return response::respond_method_not_allowed(request);
    }

    if let Some(flag) = &ctx.poll
        && request.url().split('?').next() == Some(POLL_PATH)
    {
        return response::respond_poll(request, flag.take());
    }

    let opened = resolve_path(request.url(), &ctx.root, &ctx.index).and_then(open_file);
    match opened {
        Ok(file) => {
            debug!("serve"; "GET {} -> {}", request.url(), file.path.display());
            response::respond_file(request, file, &ctx.script)
        }
        Err(e) => {
            debug!("serve"; "GET {} -> 404 ({})", request.url(), e);
            response::respond_not_found(request)
        }
    }
}
