//! RESP reply reader

use crate::{RespError, RespValue};
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Default upper bound for a single reply: 64MB.
///
/// `CLUSTER NODES` on a large cluster is a few hundred KB; anything near this
/// limit is a protocol desync, not a legitimate reply.
pub const DEFAULT_MAX_REPLY_SIZE: usize = 64 * 1024 * 1024;

/// Upper bound on array length accepted from a node
const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Reads RESP replies from a buffered async reader
pub struct ReplyReader<R: AsyncBufRead + Unpin> {
    reader: R,
    max_bytes: usize,
    consumed: usize,
}

impl<R: AsyncBufRead + Unpin + Send> ReplyReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_bytes(reader, DEFAULT_MAX_REPLY_SIZE)
    }

    pub fn with_max_bytes(reader: R, max_bytes: usize) -> Self {
        Self {
            reader,
            max_bytes,
            consumed: 0,
        }
    }

    /// Read one complete reply
    pub async fn read_reply(&mut self) -> Result<RespValue, RespError> {
        self.consumed = 0;
        self.read_value().await
    }

    fn account(&mut self, n: usize) -> Result<(), RespError> {
        self.consumed = self.consumed.saturating_add(n);
        if self.consumed > self.max_bytes {
            return Err(RespError::ReplyTooLarge(self.consumed, self.max_bytes));
        }
        Ok(())
    }

    /// Read a header line without its trailing CRLF
    async fn read_header(&mut self) -> Result<Vec<u8>, RespError> {
        let mut line = Vec::new();
        // one byte past the budget is enough to tell an oversized line apart
        let limit = self.max_bytes.saturating_sub(self.consumed).saturating_add(1) as u64;
        let n = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await?;
        if n == 0 {
            return Err(RespError::UnexpectedEof);
        }
        self.account(n)?;
        if !line.ends_with(b"\r\n") {
            return Err(RespError::InvalidFormat(
                "header line not terminated by CRLF".to_string(),
            ));
        }
        line.truncate(line.len() - 2);
        if line.is_empty() {
            return Err(RespError::InvalidFormat("empty header line".to_string()));
        }
        Ok(line)
    }

    fn read_value(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<RespValue, RespError>> + Send + '_>> {
        Box::pin(async move {
            let line = self.read_header().await?;
            let body = &line[1..];
            match line[0] {
                b'+' => Ok(RespValue::SimpleString(Bytes::copy_from_slice(body))),
                b'-' => Ok(RespValue::Error(Bytes::copy_from_slice(body))),
                b':' => Ok(RespValue::Integer(parse_len(body)?)),
                b'$' => self.read_bulk(parse_len(body)?).await,
                b'*' => {
                    let count = parse_len(body)?;
                    if count < 0 {
                        return Ok(RespValue::Null);
                    }
                    if count > MAX_ARRAY_LEN {
                        return Err(RespError::InvalidFormat(format!(
                            "array too large: {} elements",
                            count
                        )));
                    }
                    let mut items = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        items.push(self.read_value().await?);
                    }
                    Ok(RespValue::Array(items))
                }
                other => Err(RespError::InvalidType(other)),
            }
        })
    }

    async fn read_bulk(&mut self, len: i64) -> Result<RespValue, RespError> {
        if len == -1 {
            return Ok(RespValue::Null);
        }
        if len < 0 {
            return Err(RespError::InvalidFormat(format!(
                "invalid bulk string length: {}",
                len
            )));
        }
        let len = len as usize;
        self.account(len + 2)?;

        let mut data = vec![0u8; len + 2];
        self.reader.read_exact(&mut data).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                RespError::UnexpectedEof
            } else {
                RespError::Io(e)
            }
        })?;
        if !data.ends_with(b"\r\n") {
            return Err(RespError::InvalidFormat(
                "bulk string not terminated by CRLF".to_string(),
            ));
        }
        data.truncate(len);
        Ok(RespValue::BulkString(Some(Bytes::from(data))))
    }
}

fn parse_len(raw: &[u8]) -> Result<i64, RespError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            RespError::InvalidFormat(format!(
                "invalid integer: {}",
                String::from_utf8_lossy(raw)
            ))
        })
}
