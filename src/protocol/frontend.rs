use bytes::{Buf, Bytes};
use std::collections::HashMap;

use crate::protocol::error::ProtocolError;

/// SSLRequest code.
pub const SSL_REQUEST_CODE: i32 = (1234 << 16) | 5679;

/// GSSENCRequest code.
pub const GSSENC_REQUEST_CODE: i32 = (1234 << 16) | 5680;

/// CancelRequest code.
pub const CANCEL_REQUEST_CODE: i32 = (1234 << 16) | 5678;

/// Protocol major version accepted in a StartupMessage.
pub const PROTOCOL_MAJOR_VERSION: i32 = 3;

/// Tags of typed frontend messages.
pub mod tag {
    pub const QUERY: u8 = b'Q';
    pub const PARSE: u8 = b'P';
    pub const BIND: u8 = b'B';
    pub const DESCRIBE: u8 = b'D';
    pub const EXECUTE: u8 = b'E';
    pub const CLOSE: u8 = b'C';
    pub const SYNC: u8 = b'S';
    pub const FLUSH: u8 = b'H';
    pub const FUNCTION_CALL: u8 = b'F';
    pub const TERMINATE: u8 = b'X';
}

/// Untyped requests a client may send before the query phase.
#[derive(Debug)]
pub enum StartupRequest {
    /// Client wants to negotiate SSL.
    SslRequest,
    /// Client wants GSSAPI encryption.
    GssEncRequest,
    /// Client wants to cancel a query running on another connection.
    CancelRequest { process_id: i32, secret_key: i32 },
    /// Normal connection startup.
    Startup {
        protocol_version: i32,
        parameters: StartupParameters,
    },
}

impl StartupRequest {
    /// Decodes a complete length-prefixed startup frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let mut src = Bytes::copy_from_slice(frame);
        if src.len() < 8 {
            return Err(ProtocolError::InvalidMessage);
        }

        let len = src.get_i32() as usize;
        if len != frame.len() {
            return Err(ProtocolError::InvalidLength(len));
        }
        let code = src.get_i32();

        match code {
            SSL_REQUEST_CODE => Ok(StartupRequest::SslRequest),
            GSSENC_REQUEST_CODE => Ok(StartupRequest::GssEncRequest),
            CANCEL_REQUEST_CODE => {
                if src.remaining() < 8 {
                    return Err(ProtocolError::InvalidMessage);
                }
                Ok(StartupRequest::CancelRequest {
                    process_id: src.get_i32(),
                    secret_key: src.get_i32(),
                })
            }
            version if (version >> 16) == PROTOCOL_MAJOR_VERSION => {
                let parameters = StartupParameters::decode(&mut src)?;
                Ok(StartupRequest::Startup {
                    protocol_version: version,
                    parameters,
                })
            }
            _ => Err(ProtocolError::UnsupportedProtocolVersion(code)),
        }
    }
}

/// Startup parameters from the client.
#[derive(Debug, Clone, Default)]
pub struct StartupParameters {
    pub user: String,
    pub database: Option<String>,
    pub application_name: Option<String>,
    pub other: HashMap<String, String>,
}

impl StartupParameters {
    fn decode(src: &mut Bytes) -> Result<Self, ProtocolError> {
        let mut params = StartupParameters::default();

        while !src.is_empty() {
            let name = get_cstring(src)?;
            // Empty name terminates the list
            if name.is_empty() {
                break;
            }
            let value = get_cstring(src)?;

            match name.as_str() {
                "user" => params.user = value,
                "database" => params.database = Some(value),
                "application_name" => params.application_name = Some(value),
                _ => {
                    params.other.insert(name, value);
                }
            }
        }

        if params.user.is_empty() {
            return Err(ProtocolError::MissingParameter("user"));
        }

        Ok(params)
    }
}

/// Read a null-terminated string, consuming the terminator.
pub fn get_cstring(src: &mut Bytes) -> Result<String, ProtocolError> {
    let Some(null_pos) = src.iter().position(|&b| b == 0) else {
        return Err(ProtocolError::InvalidMessage);
    };

    let bytes = src.split_to(null_pos);
    src.advance(1);
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn startup_frame(params: &[(&str, &str)]) -> Vec<u8> {
        let mut body = BytesMut::new();
        body.put_i32(196608);
        for (k, v) in params {
            body.put_slice(k.as_bytes());
            body.put_u8(0);
            body.put_slice(v.as_bytes());
            body.put_u8(0);
        }
        body.put_u8(0);

        let mut frame = BytesMut::new();
        frame.put_i32(body.len() as i32 + 4);
        frame.put_slice(&body);
        frame.to_vec()
    }

    #[test]
    fn decodes_ssl_request() {
        let frame = [0x00, 0x00, 0x00, 0x08, 0x04, 0xd2, 0x16, 0x2f];
        assert!(matches!(StartupRequest::decode(&frame), Ok(StartupRequest::SslRequest)));
    }

    #[test]
    fn decodes_gssenc_request() {
        let frame = [0x00, 0x00, 0x00, 0x08, 0x04, 0xd2, 0x16, 0x30];
        assert!(matches!(StartupRequest::decode(&frame), Ok(StartupRequest::GssEncRequest)));
    }

    #[test]
    fn decodes_startup_parameters() {
        let frame = startup_frame(&[("user", "alice"), ("database", "app"), ("TimeZone", "UTC")]);
        match StartupRequest::decode(&frame) {
            Ok(StartupRequest::Startup { protocol_version, parameters }) => {
                assert_eq!(protocol_version, 196608);
                assert_eq!(parameters.user, "alice");
                assert_eq!(parameters.database.as_deref(), Some("app"));
                assert_eq!(parameters.other.get("TimeZone").map(String::as_str), Some("UTC"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn startup_without_user_is_rejected() {
        let frame = startup_frame(&[("database", "app")]);
        assert!(matches!(
            StartupRequest::decode(&frame),
            Err(ProtocolError::MissingParameter("user"))
        ));
    }

    #[test]
    fn decodes_cancel_request() {
        let mut frame = BytesMut::new();
        frame.put_i32(16);
        frame.put_i32(CANCEL_REQUEST_CODE);
        frame.put_i32(42);
        frame.put_i32(7);
        match StartupRequest::decode(&frame) {
            Ok(StartupRequest::CancelRequest { process_id, secret_key }) => {
                assert_eq!(process_id, 42);
                assert_eq!(secret_key, 7);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_code() {
        let frame = [0x00, 0x00, 0x00, 0x08, 0x00, 0x02, 0x00, 0x00];
        assert!(matches!(
            StartupRequest::decode(&frame),
            Err(ProtocolError::UnsupportedProtocolVersion(0x0002_0000))
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        let frame = [0x00, 0x00, 0x00, 0x09, 0x04, 0xd2, 0x16, 0x2f];
        assert!(matches!(StartupRequest::decode(&frame), Err(ProtocolError::InvalidLength(9))));
    }
}
