//! Memcached text-protocol client
//!
//! The "native" driver variant: a hand-rolled implementation of the
//! ascii protocol (`get`, `set`, `quit`) over a buffered TCP stream.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use crate::config::ServerAddress;
use crate::error::{ConnectionError, RequestError};

/// Buffered text-protocol connection
pub struct AsciiConnection {
    stream: BufStream<TcpStream>,
    request_timeout: Duration,
}

impl AsciiConnection {
    /// Connect and wrap the stream for line-oriented IO
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

    /// Send `quit` and shut the stream down. Errors are irrelevant at
    /// this point and dropped.
    pub async fn close(mut self) {
        let _ = self.stream.write_all(b"quit\r\n").await;
        let _ = self.stream.flush().await;
        let _ = self.stream.shutdown().await;
    }

    async fn get_inner(&mut self, key: &str) -> Result<Option<Vec<u8>>, RequestError> {
        self.stream
            .write_all(format!("get {}\r\n", key).as_bytes())
            .await?;
        self.stream.flush().await?;

        let line = self.read_line().await?;
        if line == "END" {
            return Ok(None);
        }

        if let Some((_key, _flags, len)) = parse_value_header(&line) {
            let mut data = vec![0u8; len + 2]; // data block plus trailing \r\n
            self.stream.read_exact(&mut data).await?;
            data.truncate(len);

            let end = self.read_line().await?;
            if end != "END" {
                return Err(RequestError::Protocol(format!(
                    "expected END after value, got {:?}",
                    end
                )));
            }
            return Ok(Some(data));
        }

        Err(error_from_line(&line))
    }

    async fn set_inner(
        &mut self,
        key: &str,
        value: &[u8],
        ttl_secs: u32,
    ) -> Result<(), RequestError> {
        let header = format!("set {} 0 {} {}\r\n", key, ttl_secs, value.len());
        self.stream.write_all(header.as_bytes()).await?;
        self.stream.write_all(value).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;

        let line = self.read_line().await?;
        if line == "STORED" {
            Ok(())
        } else {
            Err(error_from_line(&line))
        }
    }

    /// Read one `\r\n`-terminated line, without the terminator
    async fn read_line(&mut self) -> Result<String, RequestError> {
        let mut line = String::new();
        let n = self.stream.read_line(&mut line).await?;
        if n == 0 {
            return Err(RequestError::Closed);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

/// Parse a `VALUE <key> <flags> <bytes>` response header
pub(crate) fn parse_value_header(line: &str) -> Option<(&str, u32, usize)> {
    let mut parts = line.split_ascii_whitespace();
    if parts.next()? != "VALUE" {
        return None;
    }
    let key = parts.next()?;
    let flags: u32 = parts.next()?.parse().ok()?;
    let len: usize = parts.next()?.parse().ok()?;
    Some((key, flags, len))
}

/// Map an unexpected response line to a request error
fn error_from_line(line: &str) -> RequestError {
    if line.starts_with("SERVER_ERROR")
        || line.starts_with("CLIENT_ERROR")
        || line == "ERROR"
        || line == "NOT_STORED"
    {
        RequestError::ServerError(line.to_string())
    } else {
        RequestError::Protocol(format!("unexpected response line: {:?}", line))
    }
}
