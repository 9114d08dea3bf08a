//! Error types for memload

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        source: io::Error,
    },

    #[error("Connection timeout after {0}ms")]
    Timeout(u64),
}

/// Errors from a single in-flight request
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Connection closed unexpectedly")]
    Closed,
}

pub type Result<T> = std::result::Result<T, HarnessError>;
