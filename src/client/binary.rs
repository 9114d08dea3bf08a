//! Memcached binary-protocol client
//!
//! The second driver variant. Frames every request with the 24-byte
//! binary header; only the opcodes the harness needs are implemented
//! (GET, SET, QUIT).

use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use crate::config::ServerAddress;
use crate::error::{ConnectionError, RequestError};

pub(crate) const MAGIC_REQUEST: u8 = 0x80;
pub(crate) const MAGIC_RESPONSE: u8 = 0x81;

pub(crate) const OP_GET: u8 = 0x00;
pub(crate) const OP_SET: u8 = 0x01;
pub(crate) const OP_QUIT: u8 = 0x07;

pub(crate) const STATUS_OK: u16 = 0x0000;
pub(crate) const STATUS_KEY_NOT_FOUND: u16 = 0x0001;

pub(crate) const HEADER_LEN: usize = 24;

/// Binary-protocol connection
pub struct BinaryConnection {
    stream: BufStream<TcpStream>,
    request_timeout: Duration,
}

impl BinaryConnection {
    pub async fn connect(
        address: &ServerAddress,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let stream = super::connect_tcp(address, connect_timeout).await?;
        Ok(Self {
            stream: BufStream::new(stream),
            request_timeout,
        })
    }

    pub async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, RequestError> {
        let timeout = self.request_timeout;
        match tokio::time::timeout(timeout, self.get_inner(key)).await {
            Ok(result) => result,
            Err(_) => Err(RequestError::Timeout(timeout.as_millis() as u64)),
        }
    }

    pub async fn set(
        &mut self,
        key: &str,
        value: &[u8],
        ttl_secs: u32,
    ) -> Result<(), RequestError> {
        let timeout = self.request_timeout;
        match tokio::time::timeout(timeout, self.set_inner(key, value, ttl_secs)).await {
            Ok(result) => result,
            Err(_) => Err(RequestError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Send QUIT without waiting for the response, then shut down.
    pub async fn close(mut self) {
        let quit = encode_request(OP_QUIT, &[], b"", b"");
        let _ = self.stream.write_all(&quit).await;
        let _ = self.stream.flush().await;
        let _ = self.stream.shutdown().await;
    }

    async fn get_inner(&mut self, key: &str) -> Result<Option<Vec<u8>>, RequestError> {
        let request = encode_request(OP_GET, &[], key.as_bytes(), b"");
        self.stream.write_all(&request).await?;
        self.stream.flush().await?;

        let (header, body) = self.read_response().await?;
        match header.status {
            STATUS_OK => Ok(Some(decode_get_value(&header, &body)?)),
            STATUS_KEY_NOT_FOUND => Ok(None),
            _ => Err(status_error(header.status, &body)),
        }
    }

    async fn set_inner(
        &mut self,
        key: &str,
        value: &[u8],
        ttl_secs: u32,
    ) -> Result<(), RequestError> {
        // SET extras: flags then expiry, both big-endian u32
        let mut extras = [0u8; 8];
        extras[4..8].copy_from_slice(&ttl_secs.to_be_bytes());

        let request = encode_request(OP_SET, &extras, key.as_bytes(), value);
        self.stream.write_all(&request).await?;
        self.stream.flush().await?;

        let (header, body) = self.read_response().await?;
        if header.status == STATUS_OK {
            Ok(())
        } else {
            Err(status_error(header.status, &body))
        }
    }

    async fn read_response(&mut self) -> Result<(ResponseHeader, Vec<u8>), RequestError> {
        let mut raw = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut raw).await.map_err(map_eof)?;
        let header = decode_response_header(&raw)?;

        let mut body = vec![0u8; header.body_len as usize];
        self.stream.read_exact(&mut body).await.map_err(map_eof)?;
        Ok((header, body))
    }
}

fn map_eof(e: std::io::Error) -> RequestError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        RequestError::Closed
    } else {
        RequestError::Io(e)
    }
}

/// Strip the extras and key a GET response carries ahead of the value
///
/// The lengths come from the response header; a server claiming more
/// extras+key bytes than the body holds is a protocol error, not a
/// panic.
fn decode_get_value(header: &ResponseHeader, body: &[u8]) -> Result<Vec<u8>, RequestError> {
    let skip = header.extras_len as usize + header.key_len as usize;
    body.get(skip..)
        .map(|value| value.to_vec())
        .ok_or_else(|| {
            RequestError::Protocol(format!(
                "response body shorter than extras+key: {} < {}",
                body.len(),
                skip
            ))
        })
}

fn status_error(status: u16, body: &[u8]) -> RequestError {
    RequestError::ServerError(format!(
        "status 0x{:04x}: {}",
        status,
        String::from_utf8_lossy(body)
    ))
}

/// Decoded response header fields the client cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResponseHeader {
    pub opcode: u8,
    pub key_len: u16,
    pub extras_len: u8,
    pub status: u16,
    pub body_len: u32,
}

/// Frame a request: 24-byte header, then extras, key and value
pub(crate) fn encode_request(opcode: u8, extras: &[u8], key: &[u8], value: &[u8]) -> BytesMut {
    let body_len = extras.len() + key.len() + value.len();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + body_len);

    buf.put_u8(MAGIC_REQUEST);
    buf.put_u8(opcode);
    buf.put_u16(key.len() as u16);
    buf.put_u8(extras.len() as u8);
    buf.put_u8(0); // data type
    buf.put_u16(0); // vbucket id
    buf.put_u32(body_len as u32);
    buf.put_u32(0); // opaque
    buf.put_u64(0); // cas

    buf.put_slice(extras);
    buf.put_slice(key);
    buf.put_slice(value);
    buf
}

pub(crate) fn decode_response_header(raw: &[u8; HEADER_LEN]) -> Result<ResponseHeader, RequestError> {
    let mut buf = &raw[..];
    let magic = buf.get_u8();
    if magic != MAGIC_RESPONSE {
        return Err(RequestError::Protocol(format!(
            "invalid response magic 0x{:02x}",
            magic
        )));
    }
    let opcode = buf.get_u8();
    let key_len = buf.get_u16();
    let extras_len = buf.get_u8();
    buf.advance(1); // data type
    let status = buf.get_u16();
    let body_len = buf.get_u32();
    buf.advance(4); // opaque
    buf.advance(8); // cas

    Ok(ResponseHeader {
        opcode,
        key_len,
        extras_len,
        status,
        body_len,
    })
}
