//! Configuration error types.

use std::path::PathBuf;

use owo_colors::OwoColorize;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("served directory `{}` is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("{}", render_problems(.0))]
    Validation(Vec<String>),
}

fn render_problems(problems: &[String]) -> String {
    let mut out = format!("{}", "config validation failed:".red().bold());
    for problem in problems {
        out.push_str(&format!("\n{} {}", "→".red(), problem));
    }
    out
}
