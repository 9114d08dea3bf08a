//! Command-line argument parsing
//!
//! Raw CLI surface only; validation and defaulting happen in
//! [`HarnessConfig::from_cli`](super::HarnessConfig::from_cli).

use clap::{Parser, ValueEnum};

/// Load-generation harness for memcached-compatible cache servers
#[derive(Parser, Debug, Clone)]
#[command(name = "memload")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Connection Options =====
    /// Server hostname
    #[arg(short = 'H', long = "host", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(short = 'p', long = "port", default_value_t = 11211)]
    pub port: u16,

    /// Connect timeout in milliseconds
    #[arg(long = "connect-timeout-ms", default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long = "request-timeout-ms", default_value_t = 30000)]
    pub request_timeout_ms: u64,

    // ===== Load Parameters =====
    /// Number of simultaneous connections
    #[arg(short = 'c', long = "concurrency", default_value_t = 1)]
    pub concurrency: usize,

    /// Total number of requests to issue (if neither this nor --seconds
    /// is given, exactly one request is issued)
    #[arg(short = 'n', long = "requests")]
    pub max_requests: Option<u64>,

    /// Time to spend issuing requests, in seconds
    #[arg(short = 't', long = "seconds", allow_negative_numbers = true)]
    pub max_seconds: Option<f64>,

    /// Key to GET on every request (default: a freshly generated token)
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,

    /// Issue one SET for the key before the run starts
    #[arg(long = "prime")]
    pub prime: bool,

    /// Wire protocol variant to drive the server with
    #[arg(long = "driver", value_enum, default_value_t = DriverKind::Ascii)]
    pub driver: DriverKind,

    // ===== Output =====
    /// Enable debug logging
    #[arg(long = "verbose")]
    pub verbose: bool,

    /// Only log errors, and skip the banner
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse from the process arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// The two interchangeable connection variants
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Hand-rolled memcached text protocol
    Ascii,
    /// Memcached binary protocol
    Binary,
}
