//! memload library
//!
//! Load-generation harness for memcached-compatible cache servers: a
//! fixed pool of logical connections is kept saturated with single-key
//! GET requests until a request-count or wall-clock bound is reached,
//! then throughput and latency statistics are reported.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod report;

use client::{ClientFactory, Connection};
use config::HarnessConfig;
use dispatch::DispatchLoop;
use error::Result;
use report::Report;

/// Value stored when priming the key before a run
const PRIME_VALUE: &[u8] = b"memload";

/// Run one load test to completion and return its report
///
/// Optionally primes the key with one SET on a dedicated connection
/// first. The caller consumes the report; the binary renders it.
pub async fn run(config: HarnessConfig) -> Result<Report> {
    let factory = ClientFactory::new(&config);

    if config.prime {
        let mut conn = factory.create().await?;
        conn.set(&config.key, PRIME_VALUE, 0).await?;
        conn.close().await;
    }

    let pool = DispatchLoop::new(&config);
    Ok(pool.run(|_slot| factory.create()).await)
}
