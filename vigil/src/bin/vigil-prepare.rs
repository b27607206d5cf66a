use anyhow::Context;
use clap::Parser;
use vigil::cli::{init_tracing, PrepareCli};
use vigil::provision::prepare_users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = PrepareCli::parse()
        .into_config()
        .context("invalid configuration")?;

    prepare_users(&config)
        .await
        .context("user preparation failed")?;
    Ok(())
}
