//! Connection workers
//!
//! One supervisor thread per connection. For every socket generation it runs
//! a reader and a writer thread, waits for either to fail (or for `close`),
//! then fails everything still in flight and optionally redials.

use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{Receiver, Sender};
use crossbeam::select;

use super::pending::PendingTable;
use super::signal::Signal;
use crate::config::Options;
use crate::error::{Result, TntError};
use crate::protocol::{read_frame, write_frame, Header, Response, HEADER_SIZE};

/// State shared by the connection handle and its worker threads
pub(crate) struct Shared {
    pub(crate) host_port: String,
    pub(crate) options: Options,
    pub(crate) pending: PendingTable,
    pub(crate) outbound_tx: Sender<Bytes>,
    pub(crate) outbound_rx: Receiver<Bytes>,
    /// Fired once the connection stops accepting requests
    pub(crate) exit: Signal,
    /// Fired after every worker has exited and the pending table is drained
    pub(crate) closed: Signal,
}

/// Open a TCP socket to `host_port`, trying each resolved address
pub(crate) fn dial(host_port: &str, timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;

    for addr in host_port.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                // Disable Nagle's algorithm for low latency
                stream.set_nodelay(true)?;
                tracing::debug!("Connected to {}", addr);
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!("Dial {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => TntError::Io(e),
        None => TntError::Config(format!("{} resolved to no addresses", host_port)),
    })
}

pub(crate) fn spawn_supervisor(shared: Arc<Shared>, stream: TcpStream) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("tnt-supervisor".to_string())
        .spawn(move || supervise(&shared, stream))?;
    Ok(handle)
}

fn supervise(shared: &Shared, mut stream: TcpStream) {
    loop {
        run_session(shared, stream);
        fail_in_flight(shared);

        if shared.exit.is_fired() {
            break;
        }

        match reconnect(shared) {
            Some(next) => stream = next,
            None => break,
        }
    }

    shared.exit.fire();
    fail_in_flight(shared);
    shared.closed.fire();
    tracing::debug!("Connection to {} closed", shared.host_port);
}

/// Drive one socket until the reader or writer stops or the connection exits
fn run_session(shared: &Shared, stream: TcpStream) {
    let session = Signal::new();

    let (read_half, write_half) = match (stream.try_clone(), stream.try_clone()) {
        (Ok(read_half), Ok(write_half)) => (read_half, write_half),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Failed to split socket to {}: {}", shared.host_port, e);
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
    };

    thread::scope(|scope| {
        let reader = thread::Builder::new()
            .name("tnt-reader".to_string())
            .spawn_scoped(scope, || {
                read_responses(shared, read_half);
                session.fire();
            });
        let writer = thread::Builder::new()
            .name("tnt-writer".to_string())
            .spawn_scoped(scope, || {
                write_requests(shared, write_half, &session);
                session.fire();
            });

        if let Err(e) = reader.as_ref().and(writer.as_ref()) {
            tracing::warn!("Failed to spawn connection worker: {}", e);
            session.fire();
        }

        select! {
            recv(shared.exit.receiver()) -> _ => {}
            recv(session.receiver()) -> _ => {}
        }

        // Unblocks the reader; scope exit joins both workers
        session.fire();
        let _ = stream.shutdown(Shutdown::Both);
    });

    tracing::debug!("Session with {} ended", shared.host_port);
}

/// Resolve every in-flight and queued request with `ConnectionClosed`
///
/// The table goes first: a frame queued after its entry was failed is
/// dropped here or skipped by the next writer.
fn fail_in_flight(shared: &Shared) {
    shared
        .pending
        .drain_all(|pending| pending.resolve(Err(TntError::ConnectionClosed)));
    let dropped = shared.outbound_rx.try_iter().count();
    if dropped > 0 {
        tracing::debug!("Dropped {} queued requests", dropped);
    }
}

fn reconnect(shared: &Shared) -> Option<TcpStream> {
    for attempt in 1..=shared.options.reconnect_attempts {
        select! {
            recv(shared.exit.receiver()) -> _ => return None,
            default(shared.options.reconnect_delay) => {}
        }

        match dial(&shared.host_port, shared.options.connect_timeout) {
            Ok(stream) => {
                tracing::info!("Reconnected to {} (attempt {})", shared.host_port, attempt);
                return Some(stream);
            }
            Err(e) => {
                tracing::warn!(
                    "Reconnect to {} failed (attempt {}/{}): {}",
                    shared.host_port,
                    attempt,
                    shared.options.reconnect_attempts,
                    e
                );
            }
        }
    }
    None
}

// =============================================================================
// Reader / Writer
// =============================================================================

fn read_responses(shared: &Shared, stream: TcpStream) {
    let mut reader = BufReader::new(stream);

    loop {
        let (header, body) = match read_frame(&mut reader) {
            Ok(frame) => frame,
            Err(TntError::Io(ref e)) if is_disconnect(e) => {
                tracing::debug!("Server {} closed the connection", shared.host_port);
                return;
            }
            Err(e) => {
                tracing::warn!("Error reading from {}: {}", shared.host_port, e);
                return;
            }
        };

        tracing::trace!(
            "Received response {} ({} bytes)",
            header.request_id,
            header.body_len
        );

        // A body that doesn't decode means the stream can no longer be trusted
        let response = match Response::decode(&body) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    "Malformed response {} from {}: {}",
                    header.request_id,
                    shared.host_port,
                    e
                );
                return;
            }
        };

        match shared.pending.pop(header.request_id) {
            Some(pending) => pending.resolve(Ok(response)),
            None => tracing::trace!("Discarding response {} with no waiter", header.request_id),
        }
    }
}

fn write_requests(shared: &Shared, stream: TcpStream, session: &Signal) {
    let mut writer = BufWriter::new(stream);

    loop {
        select! {
            recv(shared.outbound_rx) -> frame => {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(_) => {
                        tracing::debug!("Outbound queue closed");
                        return;
                    }
                };

                // A frame whose caller was already failed must not reach the server
                let request_id = frame_request_id(&frame);
                if shared.pending.contains(request_id) {
                    if let Err(e) = write_frame(&mut writer, &frame) {
                        tracing::warn!("Error writing to {}: {}", shared.host_port, e);
                        return;
                    }
                } else {
                    tracing::trace!("Skipping request {} with no waiter", request_id);
                }

                // Batch bursts: only flush once nothing else is waiting
                if shared.outbound_rx.is_empty() {
                    if let Err(e) = writer.flush() {
                        tracing::warn!("Error flushing to {}: {}", shared.host_port, e);
                        return;
                    }
                }
            }
            recv(session.receiver()) -> _ => return,
        }
    }
}

fn frame_request_id(frame: &[u8]) -> u32 {
    match frame.get(..HEADER_SIZE).and_then(|raw| <&[u8; HEADER_SIZE]>::try_from(raw).ok()) {
        Some(raw) => Header::decode(raw).request_id,
        None => 0,
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
