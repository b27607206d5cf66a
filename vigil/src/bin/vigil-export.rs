use anyhow::Context;
use clap::Parser;
use vigil::cli::{init_tracing, ExportCli};
use vigil::export::export_users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ExportCli::parse()
        .into_config()
        .context("invalid configuration")?;

    export_users(&config).await.context("export failed")?;
    Ok(())
}
