use crate::api::ApiClient;
use crate::error::{LoadTestError, PoolError};
use crate::journey::JourneyExecutor;
use crate::pool::CredentialPool;
use crate::recorder::Recorder;
use crate::scenario::{Scenario, VirtualUser};
use std::path::Path;
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};
use vigil_core::{JourneyConfig, RunStatistics};

const SCENARIO_NAME: &str = "user_journey";

/// Runs the journey under the configured stages against `config.base_url`,
/// evaluates the thresholds and writes the run summary.
///
/// Threshold breaches are reported through [`RunStatistics::passed`], not as
/// an error.
pub async fn run_load_test(config: &JourneyConfig) -> Result<RunStatistics, LoadTestError> {
    let pool = CredentialPool::load(&config.users)?;
    if pool.is_empty() {
        return Err(PoolError::Empty.into());
    }
    info!(
        "Loaded {} prepared users from {}",
        pool.len(),
        config.users.display()
    );

    let recorder = Recorder::new();
    let executor = JourneyExecutor::new(
        Arc::new(pool),
        ApiClient::new(&config.base_url)?,
        recorder.clone(),
    );

    let scenario = Scenario::new(SCENARIO_NAME, move |vu: VirtualUser| {
        let executor = executor.clone();
        async move {
            executor.iteration(vu.worker, vu.iteration).await;
        }
    })
    .stages(config.stages.clone());
    let stats = scenario.await;

    let statistics = recorder
        .statistics(stats.elapsed, stats.max_workers)
        .with_thresholds(&config.thresholds);

    info!("Run complete: {statistics}");
    for threshold in &statistics.thresholds {
        if threshold.passed {
            info!("Threshold passed: {} (observed {})", threshold.name, threshold.observed);
        } else {
            error!("Threshold failed: {} (observed {})", threshold.name, threshold.observed);
        }
    }

    write_summary(&config.summary, &statistics)?;
    Ok(statistics)
}

fn write_summary(path: &Path, statistics: &RunStatistics) -> Result<(), LoadTestError> {
    let json = serde_json::to_string_pretty(statistics)?;
    std::fs::write(path, json).map_err(|source| LoadTestError::Summary {
        path: path.display().to_string(),
        source,
    })?;
    info!("Summary written to {}", path.display());
    Ok(())
}
