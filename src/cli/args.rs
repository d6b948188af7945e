//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::net::IpAddr;
use std::path::PathBuf;

/// Serve a directory over HTTP and reload the browser when files change
#[derive(Parser, Debug, Clone)]
#[command(name = "html-dev", version, about, long_about = None)]
pub struct Cli {
    /// HTTP port [default: 3000]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to serve and watch
    #[arg(short, long, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    pub dir: PathBuf,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0) [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port of the WebSocket reload channel [default: 35729]
    #[arg(long)]
    pub reload_port: Option<u16>,

    /// Reload by polling the HTTP server instead of a WebSocket
    #[arg(long)]
    pub poll: bool,

    /// Config file path (default: html-dev.toml inside the served directory)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,
}
