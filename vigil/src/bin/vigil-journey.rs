use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use vigil::cli::{init_tracing, install_prometheus, JourneyCli};
use vigil::load::run_load_test;
use vigil::recorder::describe_metrics;
use vigil_core::THRESHOLD_EXIT_CODE;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = JourneyCli::parse();
    if let Some(addr) = cli.metrics_addr {
        install_prometheus(addr).context("failed to start the metrics listener")?;
        describe_metrics();
    }
    let config = cli.into_config().context("invalid configuration")?;

    let statistics = run_load_test(&config).await.context("load test failed")?;
    if statistics.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(THRESHOLD_EXIT_CODE))
    }
}
