//! Staged virtual-worker scheduler.
//!
//! A [`Scenario`] repeatedly invokes a user function from a number of
//! concurrent virtual workers. The number of workers follows a list of
//! [`Stage`]s, ramping linearly from one target to the next, the same way a
//! ramping-VU executor does.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use vigil::scenario::{Scenario, VirtualUser};
//! use vigil_core::Stage;
//!
//! # async fn run() {
//! let stats = Scenario::new("smoke", |vu: VirtualUser| async move {
//!     println!("worker {} iteration {}", vu.worker, vu.iteration);
//! })
//! .stages(vec![
//!     Stage::new(Duration::from_secs(10), 5),
//!     Stage::new(Duration::from_secs(10), 0),
//! ])
//! .await;
//! # }
//! ```
mod workers;

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};
use vigil_core::{target_at, total_duration, Stage, GRACEFUL_STOP, METRIC_ACTIVE_WORKERS};
use workers::WorkerSet;

const RAMP_INTERVAL: Duration = Duration::from_millis(100);

/// Identity of one scenario invocation. `worker` is 1-based, `iteration`
/// counts the worker's invocations starting at 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VirtualUser {
    pub worker: usize,
    pub iteration: u64,
}

/// Summary of the scheduling side of a run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenarioStats {
    pub elapsed: Duration,
    pub max_workers: usize,
    pub iterations: u64,
}

pub struct Scenario<T> {
    name: String,
    func: T,
    stages: Vec<Stage>,
    graceful_stop: Duration,
}

impl<T, F> Scenario<T>
where
    T: Fn(VirtualUser) -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    pub fn new(name: &str, func: T) -> Self {
        Self {
            name: name.to_string(),
            func,
            stages: vec![],
            graceful_stop: GRACEFUL_STOP,
        }
    }

    pub fn stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    /// How long stopped workers may finish their current iteration before
    /// they are aborted.
    pub fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }
}

impl<T, F> IntoFuture for Scenario<T>
where
    T: Fn(VirtualUser) -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    type Output = ScenarioStats;
    type IntoFuture = Pin<Box<dyn Future<Output = ScenarioStats> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(run_scenario(self))
    }
}

#[instrument(name = "scenario", skip_all, fields(name = scenario.name))]
async fn run_scenario<T, F>(scenario: Scenario<T>) -> ScenarioStats
where
    T: Fn(VirtualUser) -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let stages = scenario.stages;
    info!(
        "Running {} over {} ({} stages)",
        scenario.name,
        humantime::format_duration(total_duration(&stages)),
        stages.len()
    );

    let start = Instant::now();
    let mut workers = WorkerSet::new(scenario.func);
    let mut max_workers = 0;

    let mut ticker = interval(RAMP_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;

        let Some(target) = target_at(&stages, start.elapsed()) else {
            break;
        };

        if target != workers.active() {
            debug!("Adjusting workers {} -> {target}", workers.active());
            workers.set_concurrency(target);
            metrics::gauge!(METRIC_ACTIVE_WORKERS).set(target as f64);
        }
        max_workers = max_workers.max(target);
    }

    info!("Stages complete, stopping workers.");
    let iterations = workers.shutdown(scenario.graceful_stop).await;
    metrics::gauge!(METRIC_ACTIVE_WORKERS).set(0.);

    let stats = ScenarioStats {
        elapsed: start.elapsed(),
        max_workers,
        iterations,
    };
    info!("Scenario complete: {stats:?}");
    stats
}
