//! In-process stand-in for the embedded SQL engine.
//!
//! # Responsibilities
//! - Prepare the data directory and resolve readiness
//! - Answer the startup cycle so clients reach the query phase
//! - Reject SQL with `feature_not_supported`
//!
//! # Design Decisions
//! - Stateless per message: the startup phase is recognized by the untyped
//!   frame layout (leading length byte is zero), not by session state
//! - Protocol violations are answered with ErrorResponse, not `Err`
//! - A cancel request or a rejected startup packet ends the session: the
//!   reply travels in [`EngineError::SessionClosed`] and carries severity FATAL

use bytes::{Bytes, BytesMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineError, ReadySignal};
use crate::protocol::frontend::tag;
use crate::protocol::{BackendMessage, StartupRequest, TransactionStatus};

/// Data directory value selecting in-memory storage.
pub const MEMORY_DATA_DIR: &str = "memory://";

const SQLSTATE_FEATURE_NOT_SUPPORTED: &str = "0A000";
const SQLSTATE_PROTOCOL_VIOLATION: &str = "08P01";

/// Where the engine keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataDir {
    Memory,
    Path(PathBuf),
}

impl DataDir {
    /// Parse a `--db` value: `memory://`, `file://<path>` or a bare path.
    pub fn parse(value: &str) -> Self {
        if value == MEMORY_DATA_DIR {
            DataDir::Memory
        } else if let Some(path) = value.strip_prefix("file://") {
            DataDir::Path(PathBuf::from(path))
        } else {
            DataDir::Path(PathBuf::from(value))
        }
    }
}

/// The engine behind every session.
#[derive(Debug)]
pub struct EmbeddedEngine {
    data_dir: DataDir,
    debug: bool,
    ready: ReadySignal,
    next_pid: AtomicI32,
}

impl EmbeddedEngine {
    /// Create an engine. It serves nothing until [`initialize`](Self::initialize) completes.
    pub fn open(config: &EngineConfig) -> Self {
        Self {
            data_dir: DataDir::parse(&config.data_dir),
            debug: config.debug,
            ready: ReadySignal::new(),
            next_pid: AtomicI32::new(1),
        }
    }

    /// Prepare storage and resolve the readiness signal.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        if let DataDir::Path(path) = &self.data_dir {
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|source| EngineError::Storage {
                    path: path.clone(),
                    source,
                })?;
        }

        if self.ready.resolve() {
            tracing::info!(data_dir = ?self.data_dir, "Engine ready");
        }
        Ok(())
    }

    /// Answer an untyped startup-phase frame. Returns true when the session must end.
    fn startup_reply(&self, request: StartupRequest, out: &mut BytesMut) -> bool {
        match request {
            StartupRequest::Startup { parameters, .. } => {
                tracing::debug!(
                    user = %parameters.user,
                    database = ?parameters.database,
                    "Startup"
                );
                BackendMessage::AuthenticationOk.encode(out);

                let params = [
                    ("server_version", "16.0"),
                    ("server_encoding", "UTF8"),
                    ("client_encoding", "UTF8"),
                    ("DateStyle", "ISO, MDY"),
                    ("TimeZone", "UTC"),
                    ("integer_datetimes", "on"),
                    ("standard_conforming_strings", "on"),
                ];
                for (name, value) in params {
                    BackendMessage::ParameterStatus {
                        name: name.to_string(),
                        value: value.to_string(),
                    }
                    .encode(out);
                }

                BackendMessage::BackendKeyData {
                    process_id: self.next_pid.fetch_add(1, Ordering::Relaxed),
                    secret_key: rand::random::<i32>(),
                }
                .encode(out);
                ready_for_query(out);
                false
            }
            StartupRequest::CancelRequest { process_id, .. } => {
                // Nothing runs long enough to cancel.
                tracing::debug!(process_id, "Cancel request ignored");
                true
            }
            StartupRequest::SslRequest | StartupRequest::GssEncRequest => {
                BackendMessage::fatal(
                    SQLSTATE_PROTOCOL_VIOLATION,
                    "unsupported frontend protocol request",
                )
                .encode(out);
                true
            }
        }
    }

    fn query_reply(&self, msg_type: u8, out: &mut BytesMut) {
        match msg_type {
            tag::QUERY | tag::FUNCTION_CALL => {
                not_supported(out);
                ready_for_query(out);
            }
            tag::PARSE => not_supported(out),
            tag::SYNC => ready_for_query(out),
            tag::BIND | tag::DESCRIBE | tag::EXECUTE | tag::CLOSE | tag::FLUSH | tag::TERMINATE => {}
            other => {
                BackendMessage::error(
                    SQLSTATE_PROTOCOL_VIOLATION,
                    format!("invalid frontend message type {}", other),
                )
                .encode(out);
            }
        }
    }
}

impl Engine for EmbeddedEngine {
    fn ready(&self) -> &ReadySignal {
        &self.ready
    }

    async fn execute_raw(&self, message: Bytes) -> Result<Bytes, EngineError> {
        self.ready.wait().await;

        if self.debug {
            tracing::debug!(len = message.len(), first = ?message.first(), "execute_raw");
        }

        let Some(&first) = message.first() else {
            return Err(EngineError::Rejected("empty message".to_string()));
        };

        let mut out = BytesMut::new();
        let closes = if first == 0 {
            match StartupRequest::decode(&message) {
                Ok(request) => self.startup_reply(request, &mut out),
                Err(e) => {
                    tracing::debug!(error = %e, "Invalid startup packet");
                    BackendMessage::fatal(SQLSTATE_PROTOCOL_VIOLATION, e.to_string()).encode(&mut out);
                    true
                }
            }
        } else {
            self.query_reply(first, &mut out);
            false
        };

        if closes {
            return Err(EngineError::SessionClosed { reply: out.freeze() });
        }
        Ok(out.freeze())
    }
}

fn not_supported(out: &mut BytesMut) {
    BackendMessage::error(
        SQLSTATE_FEATURE_NOT_SUPPORTED,
        "SQL execution is not available in this server",
    )
    .encode(out);
}

fn ready_for_query(out: &mut BytesMut) {
    BackendMessage::ReadyForQuery {
        status: TransactionStatus::Idle,
    }
    .encode(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::matcher::NEGOTIATION_REQUEST;
    use bytes::BufMut;
    use std::time::Duration;

    fn memory_engine() -> EmbeddedEngine {
        EmbeddedEngine::open(&EngineConfig::default())
    }

    fn startup_message() -> Bytes {
        let body = b"user\0alice\0\0";
        let mut frame = BytesMut::new();
        frame.put_i32(8 + body.len() as i32);
        frame.put_i32(196608);
        frame.put_slice(body);
        frame.freeze()
    }

    fn tags(reply: &[u8]) -> Vec<u8> {
        let mut tags = Vec::new();
        let mut rest = reply;
        while rest.len() >= 5 {
            let len = i32::from_be_bytes([rest[1], rest[2], rest[3], rest[4]]) as usize;
            tags.push(rest[0]);
            rest = &rest[1 + len..];
        }
        tags
    }

    #[test]
    fn parses_data_dir() {
        assert_eq!(DataDir::parse("memory://"), DataDir::Memory);
        assert_eq!(DataDir::parse("file:///tmp/db"), DataDir::Path(PathBuf::from("/tmp/db")));
        assert_eq!(DataDir::parse("./data"), DataDir::Path(PathBuf::from("./data")));
    }

    #[tokio::test]
    async fn execute_waits_for_initialize() {
        let engine = std::sync::Arc::new(memory_engine());
        let pending = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.execute_raw(startup_message()).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        engine.initialize().await.unwrap();
        let reply = pending.await.unwrap().unwrap();
        assert_eq!(reply[0], b'R');
    }

    #[tokio::test]
    async fn startup_cycle() {
        let engine = memory_engine();
        engine.initialize().await.unwrap();

        let reply = engine.execute_raw(startup_message()).await.unwrap();
        let tags = tags(&reply);
        assert_eq!(tags.first(), Some(&b'R'));
        assert!(tags.contains(&b'S'));
        assert!(tags.contains(&b'K'));
        assert_eq!(tags.last(), Some(&b'Z'));
    }

    #[tokio::test]
    async fn query_is_rejected_then_ready() {
        let engine = memory_engine();
        engine.initialize().await.unwrap();

        let query = Bytes::from_static(b"Q\0\0\0\x0dSELECT 1\0");
        let reply = engine.execute_raw(query).await.unwrap();
        assert_eq!(tags(&reply), vec![b'E', b'Z']);
        assert!(reply.windows(5).any(|w| w == b"0A000"));
    }

    #[tokio::test]
    async fn terminate_has_no_reply() {
        let engine = memory_engine();
        engine.initialize().await.unwrap();

        let reply = engine.execute_raw(Bytes::from_static(b"X\0\0\0\x04")).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn unguarded_negotiation_request_ends_session() {
        let engine = memory_engine();
        engine.initialize().await.unwrap();

        match engine.execute_raw(Bytes::from_static(&NEGOTIATION_REQUEST)).await {
            Err(EngineError::SessionClosed { reply }) => {
                assert_eq!(reply[0], b'E');
                assert!(reply.windows(5).any(|w| w == b"08P01"));
                assert!(reply.windows(5).any(|w| w == b"FATAL"));
            }
            other => panic!("expected SessionClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_request_ends_session_silently() {
        let engine = memory_engine();
        engine.initialize().await.unwrap();

        let mut cancel = BytesMut::new();
        cancel.put_i32(16);
        cancel.put_i32(80877102);
        cancel.put_i32(7);
        cancel.put_i32(42);

        match engine.execute_raw(cancel.freeze()).await {
            Err(EngineError::SessionClosed { reply }) => assert!(reply.is_empty()),
            other => panic!("expected SessionClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_protocol_version_is_fatal() {
        let engine = memory_engine();
        engine.initialize().await.unwrap();

        let body = b"user\0alice\0\0";
        let mut startup = BytesMut::new();
        startup.put_i32(8 + body.len() as i32);
        startup.put_i32(2 << 16);
        startup.put_slice(body);

        match engine.execute_raw(startup.freeze()).await {
            Err(EngineError::SessionClosed { reply }) => {
                assert_eq!(tags(&reply), vec![b'E']);
                assert!(reply.windows(6).any(|w| w == b"SFATAL"));
            }
            other => panic!("expected SessionClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn initialize_creates_data_directory() {
        let dir = std::env::temp_dir().join(format!("pgsocket-engine-{}", std::process::id()));
        let config = EngineConfig {
            data_dir: dir.to_string_lossy().into_owned(),
            debug: false,
        };
        let engine = EmbeddedEngine::open(&config);
        engine.initialize().await.unwrap();

        assert!(dir.is_dir());
        assert!(engine.ready().is_ready());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
