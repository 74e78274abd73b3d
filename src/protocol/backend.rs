use bytes::{BufMut, BytesMut};

/// Messages sent by the backend (server) to the client.
#[derive(Debug)]
pub enum BackendMessage {
    /// 'R' - AuthenticationOk
    AuthenticationOk,
    /// 'K' - Backend key data for cancel requests
    BackendKeyData { process_id: i32, secret_key: i32 },
    /// 'S' - Parameter status notification
    ParameterStatus { name: String, value: String },
    /// 'Z' - Ready for query
    ReadyForQuery { status: TransactionStatus },
    /// 'E' - Error response
    ErrorResponse { fields: Vec<ErrorField> },
}

impl BackendMessage {
    /// Build an ErrorResponse with severity, SQLSTATE and message fields.
    pub fn error(sqlstate: &str, message: impl Into<String>) -> Self {
        Self::error_with_severity("ERROR", sqlstate, message)
    }

    /// An ErrorResponse after which the backend closes the connection.
    pub fn fatal(sqlstate: &str, message: impl Into<String>) -> Self {
        Self::error_with_severity("FATAL", sqlstate, message)
    }

    fn error_with_severity(severity: &str, sqlstate: &str, message: impl Into<String>) -> Self {
        BackendMessage::ErrorResponse {
            fields: vec![
                ErrorField::new(b'S', severity),
                ErrorField::new(b'V', severity),
                ErrorField::new(b'C', sqlstate),
                ErrorField::new(b'M', message),
            ],
        }
    }

    /// Append the encoded message to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            BackendMessage::AuthenticationOk => {
                dst.put_u8(b'R');
                dst.put_i32(8);
                dst.put_i32(0); // auth type 0 = Ok
            }
            BackendMessage::BackendKeyData {
                process_id,
                secret_key,
            } => {
                dst.put_u8(b'K');
                dst.put_i32(12);
                dst.put_i32(*process_id);
                dst.put_i32(*secret_key);
            }
            BackendMessage::ParameterStatus { name, value } => {
                dst.put_u8(b'S');
                let len = 4 + name.len() + 1 + value.len() + 1;
                dst.put_i32(len as i32);
                put_cstring(dst, name);
                put_cstring(dst, value);
            }
            BackendMessage::ReadyForQuery { status } => {
                dst.put_u8(b'Z');
                dst.put_i32(5);
                dst.put_u8(status.as_byte());
            }
            BackendMessage::ErrorResponse { fields } => {
                dst.put_u8(b'E');
                let body_len: usize = fields.iter().map(|f| 1 + f.value.len() + 1).sum::<usize>() + 1;
                dst.put_i32((4 + body_len) as i32);
                for field in fields {
                    dst.put_u8(field.code);
                    put_cstring(dst, &field.value);
                }
                dst.put_u8(0);
            }
        }
    }
}

/// Transaction status indicator for ReadyForQuery.
#[derive(Debug, Clone, Copy)]
pub enum TransactionStatus {
    /// 'I' - not in a transaction block
    Idle,
    /// 'T' - in a transaction block
    InTransaction,
    /// 'E' - in a failed transaction block
    Failed,
}

impl TransactionStatus {
    fn as_byte(self) -> u8 {
        match self {
            TransactionStatus::Idle => b'I',
            TransactionStatus::InTransaction => b'T',
            TransactionStatus::Failed => b'E',
        }
    }
}

/// Error/Notice field.
#[derive(Debug)]
pub struct ErrorField {
    pub code: u8,
    pub value: String,
}

impl ErrorField {
    pub fn new(code: u8, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

fn put_cstring(dst: &mut BytesMut, s: &str) {
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
}
