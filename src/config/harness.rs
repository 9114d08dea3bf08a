//! Harness configuration derived from CLI arguments

use std::fmt;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

use super::cli::{CliArgs, DriverKind};
use crate::error::HarnessError;

/// Resolved server address
#[derive(Debug, Clone)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Complete harness configuration, immutable for the lifetime of one run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    // Connection
    pub address: ServerAddress,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub driver: DriverKind,

    // Load shape
    pub concurrency: usize,
    pub max_requests: Option<u64>,
    pub max_seconds: Option<f64>,
    pub key: String,
    pub prime: bool,

    // Output
    pub verbose: bool,
    pub quiet: bool,
}

impl HarnessConfig {
    /// Create configuration from CLI arguments
    ///
    /// Applies the default termination bound: when neither a request
    /// count nor a time limit is given, exactly one request is issued.
    pub fn from_cli(args: &CliArgs) -> Result<Self, HarnessError> {
        if args.concurrency < 1 {
            return Err(HarnessError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(secs) = args.max_seconds {
            if !secs.is_finite() || secs < 0.0 {
                return Err(HarnessError::Config(format!(
                    "invalid --seconds value: {}",
                    secs
                )));
            }
        }

        let (max_requests, max_seconds) = match (args.max_requests, args.max_seconds) {
            (None, None) => (Some(1), None),
            bounds => bounds,
        };

        Ok(Self {
            address: ServerAddress {
                host: args.host.clone(),
                port: args.port,
            },
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            driver: args.driver,
            concurrency: args.concurrency,
            max_requests,
            max_seconds,
            key: args.key.clone().unwrap_or_else(generate_key),
            prime: args.prime,
            verbose: args.verbose,
            quiet: args.quiet,
        })
    }
}

/// Generate a unique key token for this run
fn generate_key() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("test{}", token)
}
