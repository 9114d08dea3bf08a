//! Final run statistics
//!
//! Built once, at termination, from the run counters and elapsed
//! wall-clock time; immutable afterwards.

use std::time::Duration;

use crate::dispatch::RunCounters;

/// Computed statistics for one completed run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Requests issued
    pub total_requests: u64,
    /// Successful responses
    pub total_responses: u64,
    /// Failed responses
    pub total_errors: u64,
    /// Elapsed wall-clock seconds
    pub total_time_seconds: f64,
    /// Requests per second, rounded
    pub rps: u64,
    /// Mean time per request in milliseconds
    pub mean_time_ms: f64,
    /// Pool size the run was performed with
    pub concurrency: usize,
}

impl Report {
    /// Compute the report from final counters and elapsed time
    ///
    /// Degenerate runs that issued zero requests (for example, every
    /// connect failed) report `rps = 0` and `mean_time_ms = 0.0` instead
    /// of dividing by zero.
    pub fn build(counters: &RunCounters, elapsed: Duration, concurrency: usize) -> Self {
        let total_requests = counters.issued();
        let total_time_seconds = elapsed.as_secs_f64();

        let (rps, mean_time_ms) = if total_requests == 0 {
            (0, 0.0)
        } else {
            (
                (total_requests as f64 / total_time_seconds).round() as u64,
                1000.0 * total_time_seconds / total_requests as f64,
            )
        };

        Self {
            total_requests,
            total_responses: counters.succeeded(),
            total_errors: counters.failed(),
            total_time_seconds,
            rps,
            mean_time_ms,
            concurrency,
        }
    }

    /// Mean time per request averaged over all concurrent slots
    pub fn mean_time_across_concurrency(&self) -> f64 {
        self.mean_time_ms / self.concurrency as f64
    }

    /// Print the fixed-format summary block
    pub fn render(&self) {
        println!("Concurrency Level:      {}", self.concurrency);
        println!(
            "Time taken for tests:   {:.3} seconds",
            self.total_time_seconds
        );
        println!("Complete requests:      {}", self.total_responses);
        println!("Failed requests:        {}", self.total_errors);
        println!("Requests per second:    {} [#/sec] (mean)", self.rps);
        println!(
            "Time per request:       {:.3} [ms] (mean)",
            self.mean_time_ms
        );
        println!(
            "Time per request:       {:.3} [ms] (mean, across all concurrent requests)",
            self.mean_time_across_concurrency()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(issued: u64, succeeded: u64, failed: u64) -> RunCounters {
        let mut c = RunCounters::new();
        for _ in 0..issued {
            c.record_issued();
        }
        for _ in 0..succeeded {
            c.record_success();
        }
        for _ in 0..failed {
            c.record_error();
        }
        c
    }

    #[test]
    fn test_rate_arithmetic() {
        let report = Report::build(&counters(100, 100, 0), Duration::from_secs(2), 4);

        assert_eq!(report.total_requests, 100);
        assert_eq!(report.total_responses, 100);
        assert_eq!(report.total_errors, 0);
        assert_eq!(report.rps, 50);
        assert_eq!(report.mean_time_ms, 20.0);
        assert_eq!(report.mean_time_across_concurrency(), 5.0);
    }

    #[test]
    fn test_rps_is_rounded() {
        // 100 requests in 3 seconds: 33.33... rounds down
        let report = Report::build(&counters(100, 100, 0), Duration::from_secs(3), 1);
        assert_eq!(report.rps, 33);

        // 200 in 3 seconds: 66.66... rounds up
        let report = Report::build(&counters(200, 200, 0), Duration::from_secs(3), 1);
        assert_eq!(report.rps, 67);
    }

    #[test]
    fn test_errors_reported_separately() {
        let report = Report::build(&counters(20, 15, 5), Duration::from_secs(1), 1);
        assert_eq!(report.total_responses, 15);
        assert_eq!(report.total_errors, 5);
        assert_eq!(report.total_responses + report.total_errors, report.total_requests);
    }

    #[test]
    fn test_zero_requests_fallback() {
        let report = Report::build(&counters(0, 0, 0), Duration::from_secs(5), 4);
        assert_eq!(report.rps, 0);
        assert_eq!(report.mean_time_ms, 0.0);
        assert_eq!(report.total_time_seconds, 5.0);
    }
}
