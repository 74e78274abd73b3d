//! Session handler that pipes framed messages through `Engine::execute_raw`.

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::Framed;

use crate::engine::{Engine, EngineError};
use crate::net::stream::ByteStream;
use crate::session::{MessageCodec, SessionError, SessionHandler};

/// Forwards every protocol message to an engine and writes the replies back.
///
/// The connection is closed when the session detaches: on Terminate, EOF, an
/// error, or when the engine ends the session with [`EngineError::SessionClosed`].
#[derive(Debug)]
pub struct RawSession<E> {
    engine: E,
}

impl<E: Engine> RawSession<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

impl<E: Engine> SessionHandler for RawSession<E> {
    async fn attach<S: ByteStream>(&self, stream: S) -> Result<(), SessionError> {
        let mut framed = Framed::new(stream, MessageCodec::new());

        let result = async {
            while let Some(message) = framed.next().await {
                let message = message?;
                let terminate = MessageCodec::is_terminate(&message);

                let reply = match self.engine.execute_raw(message).await {
                    Ok(reply) => reply,
                    Err(EngineError::SessionClosed { reply }) => {
                        if !reply.is_empty() {
                            framed.send(reply).await?;
                        }
                        tracing::debug!("Engine closed the session");
                        break;
                    }
                    Err(e) => return Err(SessionError::from(e)),
                };
                if !reply.is_empty() {
                    framed.send(reply).await?;
                }
                if terminate {
                    tracing::debug!("Client sent Terminate");
                    break;
                }
            }
            Ok::<(), SessionError>(())
        }
        .await;

        let mut stream = framed.into_inner();
        let _ = stream.shutdown().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReadySignal;
    use bytes::Bytes;
    use tokio::io::AsyncReadExt;

    /// Replies to each message with its first byte. `!` ends the session.
    struct TagEcho {
        ready: ReadySignal,
    }

    impl Engine for TagEcho {
        fn ready(&self) -> &ReadySignal {
            &self.ready
        }

        async fn execute_raw(&self, message: Bytes) -> Result<Bytes, EngineError> {
            match message[0] {
                b'X' => return Ok(Bytes::new()),
                b'!' => {
                    return Err(EngineError::SessionClosed {
                        reply: Bytes::from_static(b"bye"),
                    })
                }
                _ => {}
            }
            Ok(message.slice(..1))
        }
    }

    fn session() -> RawSession<TagEcho> {
        RawSession::new(TagEcho {
            ready: ReadySignal::resolved(),
        })
    }

    #[tokio::test]
    async fn replies_per_message_and_stops_on_terminate() {
        let (mut client, server) = tokio::io::duplex(256);
        let handle = tokio::spawn(async move { session().attach(server).await });

        // startup (tag byte 0), query, terminate
        client
            .write_all(b"\0\0\0\x0a\0\x03\0\0\0\0Q\0\0\0\x05\0X\0\0\0\x04")
            .await
            .unwrap();

        let mut replies = Vec::new();
        client.read_to_end(&mut replies).await.unwrap();
        assert_eq!(replies, vec![0, b'Q']);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn engine_can_end_the_session() {
        let (mut client, server) = tokio::io::duplex(256);
        let handle = tokio::spawn(async move { session().attach(server).await });

        // startup, then a message the engine answers by closing
        client
            .write_all(b"\0\0\0\x0a\0\x03\0\0\0\0!\0\0\0\x04")
            .await
            .unwrap();

        // The client never closes its side; the server must.
        let mut replies = Vec::new();
        tokio::time::timeout(std::time::Duration::from_secs(1), client.read_to_end(&mut replies))
            .await
            .expect("session closed by server")
            .unwrap();
        assert_eq!(replies, b"\0bye");
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn eof_ends_session_cleanly() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        session().attach(server).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_frame_is_an_error() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(&[0, 0, 0, 2]).await.unwrap();
        let result = session().attach(server).await;
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }
}
