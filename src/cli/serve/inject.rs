//! Streaming script injection for HTML responses.
//!
//! The reload script is emitted first, then the file bytes as they are read.
//! Nothing is buffered beyond the caller's read buffer.

use std::io::{self, ErrorKind, Read};
use std::sync::Arc;

/// Reader that yields exactly `len` bytes of `inner`.
///
/// The length is fixed when the file is opened and goes out as
/// `Content-Length`. A file that grows is cut at `len`; one that shrinks is
/// an `UnexpectedEof` error, never a short success.
#[derive(Debug)]
pub struct SizedBody<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> SizedBody<R> {
    pub fn new(inner: R, len: u64) -> Self {
        Self {
            inner,
            remaining: len,
        }
    }
}

impl<R: Read> Read for SizedBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("file ended {} bytes early", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[derive(Debug)]
enum Phase {
    /// Emitting the script; the offset of the next byte
    Script(usize),
    Body,
    Done,
    /// The body failed; stays failed
    Failed(ErrorKind),
}

/// Script bytes followed by body bytes.
#[derive(Debug)]
pub struct Injected<R> {
    script: Arc<str>,
    body: R,
    phase: Phase,
}

/// Prepend `script` to `body`.
pub fn transform<R: Read>(body: R, script: Arc<str>) -> Injected<R> {
    Injected {
        script,
        body,
        phase: Phase::Script(0),
    }
}

impl<R: Read> Read for Injected<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.phase {
                Phase::Script(offset) => {
                    let rest = &self.script.as_bytes()[offset..];
                    if rest.is_empty() {
                        self.phase = Phase::Body;
                        continue;
                    }
                    let n = rest.len().min(buf.len());
                    buf[..n].copy_from_slice(&rest[..n]);
                    self.phase = Phase::Script(offset + n);
                    return Ok(n);
                }
                Phase::Body => {
                    return match self.body.read(buf) {
                        Ok(0) => {
                            self.phase = Phase::Done;
                            Ok(0)
                        }
                        Ok(n) => Ok(n),
                        Err(e) if e.kind() == ErrorKind::Interrupted => Err(e),
                        Err(e) => {
                            self.phase = Phase::Failed(e.kind());
                            Err(e)
                        }
                    };
                }
                Phase::Done => return Ok(0),
                Phase::Failed(kind) => {
                    return Err(io::Error::new(kind, "body stream already failed"));
                }
            }
        }
    }
}
