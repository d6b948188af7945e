//! URL to filesystem path resolution.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Why a request URL does not map to a servable file. Always answered with 404.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("url `{0}` is not valid percent-encoded UTF-8")]
    BadEncoding(String),

    #[error("url `{0}` escapes the served directory")]
    Traversal(String),

    #[error("cannot open `{}`", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` is a directory", .0.display())]
    Directory(PathBuf),
}

/// Map a request target onto a path under `root`.
///
/// Query and fragment are dropped, the path is percent-decoded, and any `..`
/// segment is rejected. A directory gets `index` appended. The result is not
/// guaranteed to exist; [`open_file`] decides that.
pub fn resolve_path(url: &str, root: &Path, index: &str) -> Result<PathBuf, ResolveError> {
    let relative = decode_url_path(url)?;

    let mut path = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(ResolveError::Traversal(url.to_owned())),
            // A backslash or NUL inside a segment would be reinterpreted by the OS
            s if s.contains(['\\', '\0']) => {
                return Err(ResolveError::Traversal(url.to_owned()));
            }
            s => path.push(s),
        }
    }

    if path.is_dir() {
        path.push(index);
    }
    Ok(path)
}

/// Strip query and fragment, then percent-decode.
fn decode_url_path(url: &str) -> Result<String, ResolveError> {
    let raw = url.split(['?', '#']).next().unwrap_or_default();
    percent_decode_str(raw)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| ResolveError::BadEncoding(url.to_owned()))
}

/// A file opened for serving, with the length it had when opened.
#[derive(Debug)]
pub struct OpenFile {
    pub file: File,
    pub len: u64,
    pub path: PathBuf,
}

/// Open `path` for reading. Directories (e.g. one without an index) fail.
pub fn open_file(path: PathBuf) -> Result<OpenFile, ResolveError> {
    let open_err = |source| ResolveError::Open {
        path: path.clone(),
        source,
    };
    let file = File::open(&path).map_err(open_err)?;
    let meta = file.metadata().map_err(open_err)?;
    if meta.is_dir() {
        return Err(ResolveError::Directory(path));
    }
    Ok(OpenFile {
        file,
        len: meta.len(),
        path,
    })
}
