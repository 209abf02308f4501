//! Loopback mock server for connection tests
//!
//! Speaks just enough of the protocol to frame requests and send back
//! hand-built response bodies. Behaviour is supplied per test as a handler
//! closure.

#![allow(dead_code)]

use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tnt::protocol::{decode_tuple, encode_tuple, read_frame, Header, HEADER_SIZE};
use tnt::Tuple;

/// A request frame as seen by the server
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: Header,
    pub body: Bytes,
}

impl Frame {
    /// Space word that starts select/insert/update/delete bodies
    pub fn space(&self) -> u32 {
        u32::from_le_bytes([self.body[0], self.body[1], self.body[2], self.body[3]])
    }

    /// First key tuple of a select
    pub fn select_key(&self) -> Tuple {
        decode_tuple(&self.body.slice(20..)).expect("select key")
    }

    /// Tuple following `space, flags` in insert/delete bodies
    pub fn flagged_tuple(&self) -> Tuple {
        decode_tuple(&self.body.slice(8..)).expect("tuple")
    }
}

/// What the server does after a handler call
pub enum Flow {
    Continue,
    Disconnect,
}

/// Per-connection server state handed to handlers
pub struct Peer {
    stream: TcpStream,
    pub held: Vec<Frame>,
}

impl Peer {
    pub fn reply(&mut self, request_id: u32, request_type: u32, body: &[u8]) {
        let mut frame = BytesMut::with_capacity(HEADER_SIZE + body.len());
        Header {
            request_type,
            body_len: body.len() as u32,
            request_id,
        }
        .put(&mut frame);
        frame.put_slice(body);
        let _ = self.stream.write_all(&frame);
    }

    pub fn reply_to(&mut self, frame: &Frame, body: &[u8]) {
        self.reply(frame.header.request_id, frame.header.request_type, body);
    }

    /// Write raw bytes, bypassing framing
    pub fn write_raw(&mut self, bytes: &[u8]) {
        let _ = self.stream.write_all(bytes);
    }
}

pub type Handler = dyn Fn(&mut Peer, Frame) -> Flow + Send + Sync;

pub struct MockServer {
    addr: String,
    stopped: Arc<AtomicBool>,
    received: Arc<AtomicUsize>,
    accepted: Arc<AtomicUsize>,
    clients: Arc<Mutex<Vec<TcpStream>>>,
    acceptor: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&mut Peer, Frame) -> Flow + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr").to_string();
        let handler: Arc<Handler> = Arc::new(handler);
        let stopped = Arc::new(AtomicBool::new(false));
        let received = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(AtomicUsize::new(0));
        let clients = Arc::new(Mutex::new(Vec::new()));

        let acceptor = {
            let stopped = Arc::clone(&stopped);
            let received = Arc::clone(&received);
            let accepted = Arc::clone(&accepted);
            let clients = Arc::clone(&clients);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    let Ok(stream) = stream else { continue };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    if let Ok(clone) = stream.try_clone() {
                        clients.lock().push(clone);
                    }
                    let handler = Arc::clone(&handler);
                    let received = Arc::clone(&received);
                    thread::spawn(move || serve(stream, handler, received));
                }
            })
        };

        Self {
            addr,
            stopped,
            received,
            accepted,
            clients,
            acceptor: Some(acceptor),
        }
    }

    /// Server that answers every select with `[request_id, key...]`
    pub fn echo() -> Self {
        Self::start(|peer, frame| {
            let mut tuple = vec![tnt::pack_u32(frame.header.request_id)];
            tuple.extend(frame.select_key());
            peer.reply_to(&frame, &ok_body(&[tuple]));
            Flow::Continue
        })
    }

    /// Server that reads requests and never answers
    pub fn silent() -> Self {
        Self::start(|_, _| Flow::Continue)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Total request frames received over all connections
    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    /// Total connections accepted
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Drop every open client connection, keep listening
    pub fn kick_clients(&self) {
        for client in self.clients.lock().drain(..) {
            let _ = client.shutdown(Shutdown::Both);
        }
    }

    pub fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        // Wake the acceptor
        let _ = TcpStream::connect(&self.addr);
        self.kick_clients();
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(stream: TcpStream, handler: Arc<Handler>, received: Arc<AtomicUsize>) {
    let Ok(read_half) = stream.try_clone() else { return };
    let mut reader = BufReader::new(read_half);
    let mut peer = Peer {
        stream,
        held: Vec::new(),
    };

    while let Ok((header, body)) = read_frame(&mut reader) {
        received.fetch_add(1, Ordering::SeqCst);
        if let Flow::Disconnect = handler(&mut peer, Frame { header, body }) {
            let _ = peer.stream.shutdown(Shutdown::Both);
            return;
        }
    }
}

// =============================================================================
// Response Bodies
// =============================================================================

/// Successful response carrying `tuples`
pub fn ok_body(tuples: &[Tuple]) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_u32_le(0);
    body.put_u32_le(tuples.len() as u32);
    for tuple in tuples {
        let encoded = encode_tuple(tuple).expect("encode tuple");
        body.put_u32_le(encoded.len() as u32 - 4);
        body.put_slice(&encoded);
    }
    body
}

/// Error response with a NUL-terminated message
pub fn error_body(code: u32, message: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.put_u32_le((code << 8) | 2);
    body.put_slice(message.as_bytes());
    body.put_u8(0);
    body
}
