//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use pgsocket_server::config::{Mode, ServerConfig};
use pgsocket_server::engine::{EmbeddedEngine, ReadySignal};
use pgsocket_server::lifecycle::{startup, Shutdown};
use pgsocket_server::net::listener::Listener;
use pgsocket_server::net::stream::ByteStream;
use pgsocket_server::net::{Frontend, Server};
use pgsocket_server::preamble::Preamble;
use pgsocket_server::session::{SessionError, SessionHandler};

/// Session handler that reports every byte it receives once the client closes.
pub struct RecordingHandler {
    pub attached: AtomicUsize,
    received: mpsc::UnboundedSender<Vec<u8>>,
}

impl RecordingHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = Self {
            attached: AtomicUsize::new(0),
            received: tx,
        };
        (Arc::new(handler), rx)
    }

    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }
}

impl SessionHandler for RecordingHandler {
    async fn attach<S: ByteStream>(&self, mut stream: S) -> Result<(), SessionError> {
        self.attached.fetch_add(1, Ordering::SeqCst);
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        let _ = self.received.send(bytes);
        Ok(())
    }
}

/// Session handler that always fails.
pub struct RejectingHandler;

impl SessionHandler for RejectingHandler {
    async fn attach<S: ByteStream>(&self, _stream: S) -> Result<(), SessionError> {
        Err(SessionError::Io(std::io::Error::other("attachment refused")))
    }
}

/// Start a socket-mode server with the given handler on an ephemeral port.
pub async fn start_shim_server<H: SessionHandler>(handler: Arc<H>, ready: ReadySignal) -> (SocketAddr, Shutdown) {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp, 64);
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = Server::new(listener, Frontend::Socket(Arc::new(Preamble::new(handler, ready))));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.serve(rx).await;
    });
    (addr, shutdown)
}

/// Start the full server (embedded engine, raw session) in the given mode.
pub async fn start_engine_server(mode: Mode) -> (SocketAddr, Shutdown) {
    let mut config = ServerConfig::default();
    config.mode = mode;

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp, 64);
    let addr = listener.local_addr().unwrap();

    let engine = Arc::new(EmbeddedEngine::open(&config.engine));
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = startup::serve(&config, engine, listener, server_shutdown).await;
    });
    (addr, shutdown)
}

/// A protocol 3.0 StartupMessage for `user`.
pub fn startup_message(user: &str) -> Vec<u8> {
    let mut body = vec![0x00, 0x03, 0x00, 0x00];
    body.extend_from_slice(b"user\0");
    body.extend_from_slice(user.as_bytes());
    body.extend_from_slice(b"\0\0");

    let mut frame = ((body.len() + 4) as i32).to_be_bytes().to_vec();
    frame.extend_from_slice(&body);
    frame
}

/// Read one backend message (tag, body).
pub async fn read_message<R: AsyncReadExt + Unpin>(reader: &mut R) -> (u8, Vec<u8>) {
    let tag = reader.read_u8().await.unwrap();
    let len = reader.read_i32().await.unwrap() as usize;
    let mut body = vec![0u8; len - 4];
    reader.read_exact(&mut body).await.unwrap();
    (tag, body)
}

/// Read backend messages until ReadyForQuery, returning their tags.
pub async fn read_until_ready<R: AsyncReadExt + Unpin>(reader: &mut R) -> Vec<u8> {
    let mut tags = Vec::new();
    loop {
        let (tag, _) = read_message(reader).await;
        tags.push(tag);
        if tag == b'Z' {
            return tags;
        }
    }
}
