//! HTTP response handlers.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tiny_http::{Header, Request, Response, StatusCode};

use super::inject::{SizedBody, transform};
use super::path::OpenFile;
use crate::utils::mime::{self, types::PLAIN};

/// Respond with a file, prepending `script` when it is HTML.
///
/// The body is streamed and `Content-Length` is always declared, so a read
/// failure mid-way leaves the client with a visibly short response.
pub fn respond_file(request: Request, file: OpenFile, script: &Arc<str>) -> Result<()> {
    let content_type = mime::from_path(&file.path);
    let body = SizedBody::new(file.file, file.len);

    if mime::is_html(content_type) {
        let len = script.len() as u64 + file.len;
        send_stream(request, 200, content_type, transform(body, Arc::clone(script)), len)
    } else {
        send_stream(request, 200, content_type, body, file.len)
    }
}

/// Respond with plain 404.
pub fn respond_not_found(request: Request) -> Result<()> {
    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

/// Answer the poll endpoint: 205 when the page is stale, 204 otherwise.
pub fn respond_poll(request: Request, stale: bool) -> Result<()> {
    let status = if stale { 205 } else { 204 };
    let response = Response::empty(StatusCode(status)).with_header(header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

/// Respond with 405 for anything but GET.
pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(header("Content-Type", PLAIN)?)
        .with_header(header("Allow", "GET")?);
    request.respond(response)?;
    Ok(())
}

fn send_stream<R: Read>(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: R,
    len: u64,
) -> Result<()> {
    let len = usize::try_from(len).map_err(|_| anyhow!("file too large to serve: {len} bytes"))?;
    let response = Response::new(
        StatusCode(status),
        vec![
            header("Content-Type", content_type)?,
            header("Cache-Control", "no-cache")?,
        ],
        body,
        Some(len),
        None,
    )
    // Identity encoding at any size; a chunked body would end cleanly on error
    .with_chunked_threshold(usize::MAX);

    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type)?);
    request.respond(response)?;
    Ok(())
}

fn header(key: &'static str, value: &'static str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}
