//! Run-wide latency and failure bookkeeping.
//!
//! Every observation is emitted through the `metrics` facade, so an installed
//! exporter sees it, and is also kept in-process so thresholds can be
//! evaluated when the run ends.
use metrics_util::AtomicBucket;
use pdatastructs::tdigest::{TDigest, K1};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::{Duration, Instant};
use tracing::error;
use vigil_core::{
    LatencySummary, RunStatistics, METRIC_ACTIVE_WORKERS, METRIC_JOURNEY_DURATION,
    METRIC_REQS, METRIC_REQ_DURATION, METRIC_REQ_FAILED,
};

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Pending observations are folded into the digest every this many records.
const FOLD_EVERY: u64 = 1024;

/// Registers descriptions for every metric the harness emits. Call after an
/// exporter is installed.
pub fn describe_metrics() {
    metrics::describe_histogram!(
        METRIC_JOURNEY_DURATION,
        metrics::Unit::Seconds,
        "Wall-clock duration of one login-to-comment journey iteration."
    );
    metrics::describe_histogram!(
        METRIC_REQ_DURATION,
        metrics::Unit::Seconds,
        "Duration of a single HTTP request against the target API."
    );
    metrics::describe_counter!(METRIC_REQS, "HTTP requests sent.");
    metrics::describe_counter!(METRIC_REQ_FAILED, "HTTP requests that failed.");
    metrics::describe_gauge!(METRIC_ACTIVE_WORKERS, "Active virtual workers.");
}

#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Inner>,
}

struct Inner {
    requests: AtomicU64,
    failed_requests: AtomicU64,
    journeys: AtomicU64,
    request_latency: Latencies,
    journey_latency: Latencies,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            journeys: AtomicU64::new(0),
            request_latency: Latencies::new(),
            journey_latency: Latencies::new(),
        }
    }
}

/// Lock-free intake in front of a digest. Memory stays bounded by
/// [`FOLD_EVERY`] pending samples plus the digest itself.
struct Latencies {
    pending: AtomicBucket<Duration>,
    folded: Mutex<Folded>,
}

struct Folded {
    digest: TDigest<K1>,
    count: u64,
}

impl Latencies {
    fn new() -> Self {
        Self {
            pending: AtomicBucket::new(),
            folded: Mutex::new(Folded {
                digest: TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE),
                count: 0,
            }),
        }
    }

    fn push(&self, elapsed: Duration, seen: u64) {
        self.pending.push(elapsed);
        if seen % FOLD_EVERY == 0 {
            self.fold();
        }
    }

    fn fold(&self) {
        let mut folded = self.folded.lock().unwrap_or_else(PoisonError::into_inner);
        self.pending.clear_with(|batch| {
            for latency in batch {
                folded.digest.insert(latency.as_secs_f64());
            }
            folded.count += batch.len() as u64;
        });
    }

    fn summary(&self) -> LatencySummary {
        self.fold();
        let folded = self.folded.lock().unwrap_or_else(PoisonError::into_inner);
        if folded.count == 0 {
            return LatencySummary::default();
        }

        LatencySummary {
            count: folded.count,
            p50: quantile(&folded.digest, 0.5),
            p90: quantile(&folded.digest, 0.9),
            p95: quantile(&folded.digest, 0.95),
            p99: quantile(&folded.digest, 0.99),
        }
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one HTTP request. `failed` covers transport errors and
    /// statuses outside of 2xx/3xx.
    pub fn record_request(&self, elapsed: Duration, failed: bool) {
        metrics::histogram!(METRIC_REQ_DURATION).record(elapsed.as_secs_f64());
        metrics::counter!(METRIC_REQS).increment(1);
        let seen = self.inner.requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.request_latency.push(elapsed, seen);

        if failed {
            metrics::counter!(METRIC_REQ_FAILED).increment(1);
            self.inner.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_journey(&self, elapsed: Duration) {
        metrics::histogram!(METRIC_JOURNEY_DURATION).record(elapsed.as_secs_f64());
        let seen = self.inner.journeys.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.journey_latency.push(elapsed, seen);
    }

    /// Starts timing one journey. The duration is recorded when the returned
    /// guard is dropped, whichever way the iteration ends.
    pub fn journey_timer(&self) -> JourneyTimer {
        JourneyTimer {
            recorder: self.clone(),
            start: Instant::now(),
        }
    }

    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.inner.failed_requests.load(Ordering::Relaxed)
    }

    pub fn journeys(&self) -> u64 {
        self.inner.journeys.load(Ordering::Relaxed)
    }

    pub fn failed_rate(&self) -> f64 {
        let requests = self.requests();
        if requests == 0 {
            0.
        } else {
            self.failed_requests() as f64 / requests as f64
        }
    }

    pub fn statistics(&self, elapsed: Duration, max_workers: usize) -> RunStatistics {
        RunStatistics {
            elapsed,
            max_workers,
            iterations: self.journeys(),
            requests: self.requests(),
            failed_requests: self.failed_requests(),
            failed_rate: self.failed_rate(),
            http_req_duration: self.inner.request_latency.summary(),
            full_user_journey_duration: self.inner.journey_latency.summary(),
            thresholds: vec![],
        }
    }
}

/// Scoped journey measurement, see [`Recorder::journey_timer`].
pub struct JourneyTimer {
    recorder: Recorder,
    start: Instant,
}

impl Drop for JourneyTimer {
    fn drop(&mut self) {
        self.recorder.record_journey(self.start.elapsed());
    }
}

fn quantile(digest: &TDigest<K1>, q: f64) -> Duration {
    let secs = digest.quantile(q);

    // TDigest can produce NaN on degenerate inputs.
    if secs.is_finite() && secs >= 0. {
        Duration::from_secs_f64(secs)
    } else {
        error!("Non-finite latency quantile p{}.", q * 100.);
        Duration::ZERO
    }
}
