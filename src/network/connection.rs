//! Client connection
//!
//! A `Connection` multiplexes any number of concurrent requests over one
//! TCP socket. Callers block in [`Connection::execute`]; the worker threads
//! in `worker` move bytes and route responses back by request ID.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel;
use crossbeam::select;
use parking_lot::Mutex;

use super::pending::{PendingRequest, PendingTable};
use super::request_id::RequestIdSequence;
use super::signal::Signal;
use super::worker::{dial, spawn_supervisor, Shared};
use crate::config::{Address, Options};
use crate::error::{Result, TntError};
use crate::protocol::{Request, Tuple};

/// Handle to one multiplexed connection
///
/// Share it between threads behind an `Arc`. Dropping the last handle
/// closes the connection.
pub struct Connection {
    shared: Arc<Shared>,
    default_space: u32,
    request_ids: RequestIdSequence,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Connect to `host:port[/default_space]`
    ///
    /// Fails if the first dial fails; later socket loss is handled by the
    /// workers.
    pub fn connect(addr: &str, options: Options) -> Result<Self> {
        let address = Address::parse(addr)?;
        let default_space = options
            .default_space
            .or(address.default_space)
            .unwrap_or(0);

        let stream = dial(&address.host_port, options.connect_timeout)?;
        tracing::debug!(
            "Connection to {} established (default space {})",
            address.host_port,
            default_space
        );

        let (outbound_tx, outbound_rx) = channel::bounded(options.queue_capacity);
        let shared = Arc::new(Shared {
            host_port: address.host_port,
            options,
            pending: PendingTable::new(),
            outbound_tx,
            outbound_rx,
            exit: Signal::new(),
            closed: Signal::new(),
        });

        let supervisor = spawn_supervisor(Arc::clone(&shared), stream)?;

        Ok(Self {
            shared,
            default_space,
            request_ids: RequestIdSequence::new(),
            supervisor: Mutex::new(Some(supervisor)),
        })
    }

    /// Execute a request with the connection's query timeout
    pub fn execute(&self, request: impl Into<Request>) -> Result<Vec<Tuple>> {
        self.execute_timeout(request, self.shared.options.query_timeout)
    }

    /// Execute a request, giving up after `timeout`
    ///
    /// The timeout covers both handing the request to the writer and
    /// waiting for the response.
    pub fn execute_timeout(&self, request: impl Into<Request>, timeout: Duration) -> Result<Vec<Tuple>> {
        let request = request.into();
        let deadline = match Instant::now().checked_add(timeout) {
            Some(at) => channel::at(at),
            None => channel::never(),
        };

        let id = self.request_ids.next();
        let raw = request.pack(id, self.default_space)?;

        if self.shared.exit.is_fired() {
            return Err(TntError::ConnectionClosed);
        }

        let (pending, replies) = PendingRequest::new(id, raw);
        let frame = pending.raw().clone();
        if let Some(stale) = self.shared.pending.put(pending) {
            tracing::warn!("Request id {} reused while still in flight", id);
            stale.resolve(Err(TntError::ShredOldRequests));
        }

        // Close may have drained the table between the check above and put
        if self.shared.exit.is_fired() {
            self.shared.pending.pop(id);
            return Err(TntError::ConnectionClosed);
        }

        select! {
            send(self.shared.outbound_tx, frame) -> sent => {
                if sent.is_err() {
                    self.shared.pending.pop(id);
                    return Err(TntError::ConnectionClosed);
                }
            }
            recv(self.shared.exit.receiver()) -> _ => {
                self.shared.pending.pop(id);
                return Err(TntError::ConnectionClosed);
            }
            recv(deadline) -> _ => {
                self.shared.pending.pop(id);
                return Err(TntError::RequestTimeout);
            }
        }

        // A late response stays in the table until the reader pops it or close drains it
        select! {
            recv(replies) -> reply => match reply {
                Ok(reply) => reply?.into_result(),
                Err(_) => Err(TntError::ConnectionClosed),
            },
            recv(self.shared.exit.receiver()) -> _ => {
                self.shared.pending.pop(id);
                match replies.try_recv() {
                    Ok(reply) => reply?.into_result(),
                    Err(_) => Err(TntError::ConnectionClosed),
                }
            }
            recv(deadline) -> _ => Err(TntError::ResponseTimeout),
        }
    }

    /// Close the connection
    ///
    /// Fails every in-flight request with `ConnectionClosed` and returns once
    /// all worker threads have exited. Safe to call more than once and from
    /// several threads.
    pub fn close(&self) {
        if self.shared.exit.fire() {
            tracing::debug!("Closing connection to {}", self.shared.host_port);
        }
        self.shared.closed.wait();

        if let Some(supervisor) = self.supervisor.lock().take() {
            if supervisor.join().is_err() {
                tracing::error!("Connection supervisor for {} panicked", self.shared.host_port);
            }
        }
    }

    /// True once the connection no longer accepts requests
    pub fn is_closed(&self) -> bool {
        self.shared.exit.is_fired()
    }

    /// Space used by requests without an explicit one
    pub fn default_space(&self) -> u32 {
        self.default_space
    }

    pub fn options(&self) -> &Options {
        &self.shared.options
    }

    /// Number of requests awaiting a response
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connect with the given options
pub fn connect(addr: &str, options: Options) -> Result<Connection> {
    Connection::connect(addr, options)
}
