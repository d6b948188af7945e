//! WebSocket Server for Live Reload
//!
//! A dedicated listener, separate from the HTTP port. Every accepted
//! connection gets its own thread that subscribes to the [`FanOut`], writes
//! the sentinel for each reload signal, and unsubscribes when the peer goes
//! away.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::Receiver;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::{FanOut, ReloadSignal};
use crate::core::is_shutdown;

/// Acceptor sleep when no connection is pending
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Read timeout on an open connection; bounds signal latency and close detection
const READ_POLL: Duration = Duration::from_millis(50);

/// A client that connects but never finishes the handshake is dropped after this
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound reload listener, not yet accepting.
pub struct ReloadServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl ReloadServer {
    /// Bind the listener. A busy port is fatal; there is no fallback port.
    pub fn bind(interface: IpAddr, port: u16) -> Result<Self> {
        let addr = SocketAddr::new(interface, port);
        let listener = TcpListener::bind(addr)
            .with_context(|| format!("failed to bind reload channel on {addr}"))?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Start the acceptor thread.
    pub fn spawn(self, fanout: FanOut, sentinel: Arc<str>) -> Result<JoinHandle<()>> {
        self.listener.set_nonblocking(true)?;

        let listener = self.listener;
        Ok(thread::spawn(move || accept_loop(listener, fanout, sentinel)))
    }
}

fn accept_loop(listener: TcpListener, fanout: FanOut, sentinel: Arc<str>) {
    while !is_shutdown() {
        match listener.accept() {
            Ok((stream, peer)) => {
                crate::debug!("reload"; "client connected: {}", peer);

                // Set blocking for WebSocket operations
                let _ = stream.set_nonblocking(false);

                let fanout = fanout.clone();
                let sentinel = Arc::clone(&sentinel);
                thread::spawn(move || {
                    if let Err(e) = serve_client(stream, &fanout, &sentinel) {
                        crate::debug!("reload"; "client {} dropped: {:#}", peer, e);
                    } else {
                        crate::debug!("reload"; "client {} closed", peer);
                    }
                });
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                crate::log!("reload"; "accept error: {}", e);
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

/// Hold one reload connection open until the peer leaves.
fn serve_client(stream: TcpStream, fanout: &FanOut, sentinel: &str) -> Result<()> {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    let mut ws = tungstenite::accept(stream).map_err(|e| anyhow!("handshake failed: {e}"))?;
    ws.get_ref().set_read_timeout(Some(READ_POLL))?;

    let (tx, rx) = crossbeam::channel::unbounded::<ReloadSignal>();
    let subscription = fanout.subscribe(Arc::new(tx));

    let result = pump(&mut ws, &rx, sentinel);

    subscription.unsubscribe();
    let _ = ws.close(None);
    let _ = ws.flush();
    result
}

/// Alternate between flushing pending signals and polling the socket for close.
fn pump(
    ws: &mut WebSocket<TcpStream>,
    signals: &Receiver<ReloadSignal>,
    sentinel: &str,
) -> Result<()> {
    loop {
        if is_shutdown() {
            return Ok(());
        }

        for signal in signals.try_iter() {
            ws.send(Message::Text(sentinel.to_owned().into()))?;
            crate::debug!("reload"; "sent #{}", signal.seq);
        }

        match ws.read() {
            Ok(Message::Close(_)) => return Ok(()),
            // Client messages carry nothing we act on
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}
