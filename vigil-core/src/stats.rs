use crate::{DEFAULT_MAX_FAILED_RATE, DEFAULT_MAX_JOURNEY_P95, DEFAULT_MAX_REQ_P95};
use serde::Serialize;
use serde_with::{serde_as, DurationMilliSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Quantiles of one latency metric over a whole run.
#[serde_as]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p50: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p95: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p99: Duration,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count={}, p50={:?}, p90={:?}, p95={:?}, p99={:?}",
            self.count, self.p50, self.p90, self.p95, self.p99
        )
    }
}

/// Pass/fail criteria for a load-test run.
#[serde_as]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max_req_p95: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max_journey_p95: Duration,
    pub max_failed_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_req_p95: DEFAULT_MAX_REQ_P95,
            max_journey_p95: DEFAULT_MAX_JOURNEY_P95,
            max_failed_rate: DEFAULT_MAX_FAILED_RATE,
        }
    }
}

impl Thresholds {
    pub fn evaluate(&self, stats: &RunStatistics) -> Vec<ThresholdResult> {
        vec![
            ThresholdResult {
                name: format!(
                    "http_req_duration p(95)<{}",
                    humantime::format_duration(self.max_req_p95)
                ),
                observed: stats.http_req_duration.p95.as_secs_f64(),
                passed: stats.http_req_duration.p95 < self.max_req_p95,
            },
            ThresholdResult {
                name: format!("http_req_failed rate<{}", self.max_failed_rate),
                observed: stats.failed_rate,
                passed: stats.failed_rate < self.max_failed_rate,
            },
            ThresholdResult {
                name: format!(
                    "full_user_journey_duration p(95)<{}",
                    humantime::format_duration(self.max_journey_p95)
                ),
                observed: stats.full_user_journey_duration.p95.as_secs_f64(),
                passed: stats.full_user_journey_duration.p95 < self.max_journey_p95,
            },
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub name: String,
    pub observed: f64,
    pub passed: bool,
}

/// Statistics of a finished load-test run.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    pub max_workers: usize,
    pub iterations: u64,
    pub requests: u64,
    pub failed_requests: u64,
    pub failed_rate: f64,
    pub http_req_duration: LatencySummary,
    pub full_user_journey_duration: LatencySummary,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunStatistics {
    pub fn with_thresholds(mut self, thresholds: &Thresholds) -> Self {
        self.thresholds = thresholds.evaluate(&self);
        self
    }

    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "elapsed={}, max_workers={}, iterations={}, requests={}, failed={} ({:.2}%), http_req_duration[{}], full_user_journey_duration[{}]",
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64)),
            self.max_workers,
            self.iterations,
            self.requests,
            self.failed_requests,
            self.failed_rate * 100.,
            self.http_req_duration,
            self.full_user_journey_duration,
        )
    }
}
