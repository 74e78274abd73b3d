//! Protocol parsing errors.

use thiserror::Error;

/// Errors raised while framing or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid message")]
    InvalidMessage,

    #[error("message length {0} outside allowed range")]
    InvalidLength(usize),

    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(i32),

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
