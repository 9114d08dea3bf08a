//! Client connection layer
//!
//! The dispatch loop only sees the [`Connection`] capability; the two
//! wire-protocol variants live behind the closed [`CacheClient`] set and
//! are selected once, at pool construction, by the `--driver` flag.

pub mod ascii;
pub mod binary;

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::config::{DriverKind, HarnessConfig, ServerAddress};
use crate::error::{ConnectionError, RequestError};

pub use ascii::AsciiConnection;
pub use binary::BinaryConnection;

/// A single-outstanding-request cache connection
///
/// `get` and `set` complete asynchronously with a result or failure;
/// `close` consumes the connection. Requests on one connection are
/// strictly sequential: the caller must not issue a new request before
/// the previous one has completed.
pub trait Connection {
    /// Fetch a key; `Ok(None)` is a miss.
    fn get(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, RequestError>>;

    /// Store a value under a key with the given TTL (0 = no expiry).
    fn set(
        &mut self,
        key: &str,
        value: &[u8],
        ttl_secs: u32,
    ) -> impl Future<Output = Result<(), RequestError>>;

    /// Close the connection, consuming it. Never fails.
    fn close(self) -> impl Future<Output = ()>;
}

/// The closed set of wire-protocol variants
pub enum CacheClient {
    Ascii(AsciiConnection),
    Binary(BinaryConnection),
}

impl Connection for CacheClient {
    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, RequestError> {
        match self {
            CacheClient::Ascii(conn) => conn.get(key).await,
            CacheClient::Binary(conn) => conn.get(key).await,
        }
    }

    async fn set(&mut self, key: &str, value: &[u8], ttl_secs: u32) -> Result<(), RequestError> {
        match self {
            CacheClient::Ascii(conn) => conn.set(key, value, ttl_secs).await,
            CacheClient::Binary(conn) => conn.set(key, value, ttl_secs).await,
        }
    }

    async fn close(self) {
        match self {
            CacheClient::Ascii(conn) => conn.close().await,
            CacheClient::Binary(conn) => conn.close().await,
        }
    }
}

/// Factory for creating connections with common config
#[derive(Clone)]
pub struct ClientFactory {
    pub address: ServerAddress,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub driver: DriverKind,
}

impl ClientFactory {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            address: config.address.clone(),
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            driver: config.driver,
        }
    }

    /// Create a new connection of the configured variant
    pub async fn create(&self) -> Result<CacheClient, ConnectionError> {
        match self.driver {
            DriverKind::Ascii => Ok(CacheClient::Ascii(
                AsciiConnection::connect(&self.address, self.connect_timeout, self.request_timeout)
                    .await?,
            )),
            DriverKind::Binary => Ok(CacheClient::Binary(
                BinaryConnection::connect(&self.address, self.connect_timeout, self.request_timeout)
                    .await?,
            )),
        }
    }
}

/// Open a TCP stream to the server within the connect timeout
pub(crate) async fn connect_tcp(
    address: &ServerAddress,
    connect_timeout: Duration,
) -> Result<TcpStream, ConnectionError> {
    let connect = TcpStream::connect((address.host.as_str(), address.port));
    let stream = tokio::time::timeout(connect_timeout, connect)
        .await
        .map_err(|_| ConnectionError::Timeout(connect_timeout.as_millis() as u64))?
        .map_err(|e| ConnectionError::ConnectFailed {
            host: address.host.clone(),
            port: address.port,
            source: e,
        })?;

    stream.set_nodelay(true).ok();
    Ok(stream)
}
