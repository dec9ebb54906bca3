//! RESP (REdis Serialization Protocol) client codec
//!
//! Encodes outgoing commands as arrays of bulk strings and decodes the
//! replies a Redis node sends back. Only the RESP2 reply types are supported;
//! cluster management commands never answer with RESP3 frames unless asked to.

mod encoder;
mod reader;

pub use encoder::{encode_to_vec, RespEncoder};
pub use reader::{ReplyReader, DEFAULT_MAX_REPLY_SIZE};

use bytes::Bytes;
use std::io;

/// RESP data type
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(Bytes),
    /// Error: -ERR message\r\n
    Error(Bytes),
    /// Integer: :123\r\n
    Integer(i64),
    /// Bulk string: $5\r\nhello\r\n
    BulkString(Option<Bytes>),
    /// Array: *2\r\n$3\r\nGET\r\n$3\r\nkey\r\n
    Array(Vec<RespValue>),
    /// Null bulk string or null array
    Null,
}

impl RespValue {
    /// Build the request frame for a command: an array of bulk strings
    pub fn command<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RespValue::Array(
            args.into_iter()
                .map(|arg| RespValue::BulkString(Some(Bytes::copy_from_slice(arg.as_ref().as_bytes()))))
                .collect(),
        )
    }

    /// Returns the error message if this is an error reply
    pub fn as_error(&self) -> Option<String> {
        match self {
            RespValue::Error(msg) => Some(String::from_utf8_lossy(msg).into_owned()),
            _ => None,
        }
    }

    /// Render a reply as text.
    ///
    /// Nested arrays are flattened one element per line, which is how
    /// `redis-cli` prints them. Error replies (at any depth) are returned as `Err`.
    pub fn into_text(self) -> Result<String, String> {
        match self {
            RespValue::SimpleString(s) => Ok(String::from_utf8_lossy(&s).into_owned()),
            RespValue::BulkString(Some(s)) => Ok(String::from_utf8_lossy(&s).into_owned()),
            RespValue::BulkString(None) | RespValue::Null => Ok(String::new()),
            RespValue::Integer(n) => Ok(n.to_string()),
            RespValue::Error(msg) => Err(String::from_utf8_lossy(&msg).into_owned()),
            RespValue::Array(items) => {
                let lines = items
                    .into_iter()
                    .map(RespValue::into_text)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(lines.join("\n"))
            }
        }
    }
}

/// RESP codec error
#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid RESP format: {0}")]
    InvalidFormat(String),
    #[error("Connection closed before a complete reply was read")]
    UnexpectedEof,
    #[error("Reply too large: {0} bytes (max: {1} bytes)")]
    ReplyTooLarge(usize, usize),
    #[error("Invalid RESP type byte: {0:#04x}")]
    InvalidType(u8),
}
