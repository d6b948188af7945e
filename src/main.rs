//! html-dev - serve a directory of plain HTML and reload the browser on change.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod reload;
mod utils;

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{ColorChoice, Parser};

use actor::fs::FsActor;
use cli::Cli;
use cli::serve::{ServeContext, bind_server};
use config::{DevConfig, ReloadMode};
use reload::{FanOut, Notify, PollFlag, ReloadServer};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = DevConfig::load(&cli)?;
    serve(&config)?;

    if let Some(reason) = core::take_failure() {
        bail!("{reason}");
    }
    Ok(())
}

/// Bind everything up front, then block in the request loop until shutdown.
///
/// Any bind or watcher failure here ends the process before a request is served.
fn serve(config: &DevConfig) -> Result<()> {
    let (script, notifier, push, poll) = match config.reload.mode {
        ReloadMode::Websocket => {
            let server = ReloadServer::bind(config.serve.interface, config.reload.port)?;
            let fanout = FanOut::new();
            let script = embed::serve::injected_script(config, server.port());
            (
                script,
                Arc::new(fanout.clone()) as Arc<dyn Notify>,
                Some((server, fanout)),
                None,
            )
        }
        ReloadMode::Poll => {
            let flag = PollFlag::new();
            let script = embed::serve::injected_script(config, 0);
            (
                script,
                Arc::new(flag.clone()) as Arc<dyn Notify>,
                None,
                Some(flag),
            )
        }
    };

    let fs = FsActor::new(config, notifier)?;
    let http = bind_server(config)?;

    if let Some((server, fanout)) = push {
        log!("reload"; "ws://{}", server.addr());
        server.spawn(fanout, Arc::from(config.reload.sentinel.as_str()))?;
    } else {
        log!("reload"; "polling {}", reload::poll::POLL_PATH);
    }

    let ctx = ServeContext::new(config, script, poll);
    http.run(ctx, fs, config.serve.workers)
}
