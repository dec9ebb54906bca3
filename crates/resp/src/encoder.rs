//! RESP frame encoder

use crate::RespValue;
use bytes::{BufMut, BytesMut};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes RESP frames to an async writer.
///
/// Each frame is serialized into an internal buffer first so that it reaches
/// the socket in a single `write_all`.
pub struct RespEncoder<W: AsyncWrite + Unpin> {
    writer: W,
    buf: BytesMut,
}

impl<W: AsyncWrite + Unpin> RespEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Encode a frame and flush it to the writer
    pub async fn send(&mut self, value: &RespValue) -> io::Result<()> {
        self.buf.clear();
        encode_into(value, &mut self.buf);
        self.writer.write_all(&self.buf).await?;
        self.writer.flush().await
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn encode_into(value: &RespValue, buf: &mut BytesMut) {
    match value {
        RespValue::SimpleString(s) => {
            buf.put_u8(b'+');
            buf.put_slice(s);
            buf.put_slice(b"\r\n");
        }
        RespValue::Error(e) => {
            buf.put_u8(b'-');
            buf.put_slice(e);
            buf.put_slice(b"\r\n");
        }
        RespValue::Integer(n) => {
            buf.put_slice(format!(":{}\r\n", n).as_bytes());
        }
        RespValue::BulkString(Some(bytes)) => {
            buf.put_slice(format!("${}\r\n", bytes.len()).as_bytes());
            buf.put_slice(bytes);
            buf.put_slice(b"\r\n");
        }
        RespValue::BulkString(None) | RespValue::Null => {
            buf.put_slice(b"$-1\r\n");
        }
        RespValue::Array(items) => {
            buf.put_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_into(item, buf);
            }
        }
    }
}

/// Encode a frame into a fresh byte vector
pub fn encode_to_vec(value: &RespValue) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_into(value, &mut buf);
    buf.to_vec()
}
