//! Command-line surfaces of the three binaries. Every flag can also come from
//! the environment (or a `.env` file loaded by the binary). Parsed arguments
//! are validated into the plain config structs of `vigil-core`.
use clap::{Args, Parser};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vigil_core::{
    ConfigError, DatabaseConfig, ExportConfig, JourneyConfig, ProvisionConfig, Stage, Thresholds,
    DEFAULT_EXPORT_FILE, DEFAULT_PREPARED_USERS_FILE, DEFAULT_STAGES, DEFAULT_SUMMARY_FILE,
};

const DEFAULT_LOG_FILTER: &str = "vigil=info";

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    #[arg(long, env = "DATABASE_HOST")]
    pub database_host: String,

    #[arg(long, env = "DATABASE_PORT")]
    pub database_port: u16,

    #[arg(long, env = "DATABASE_NAME")]
    pub database_name: String,

    #[arg(long, env = "DATABASE_USERNAME")]
    pub database_username: String,

    #[arg(long, env = "DATABASE_PASSWORD", hide_env_values = true)]
    pub database_password: String,
}

impl DatabaseArgs {
    pub fn into_config(self) -> Result<DatabaseConfig, ConfigError> {
        DatabaseConfig::new(
            self.database_host,
            self.database_port,
            self.database_name,
            self.database_username,
            self.database_password,
        )
    }
}

/// Register, verify and log in a batch of synthetic users.
#[derive(Parser, Debug)]
#[command(name = "vigil-prepare", version)]
pub struct PrepareCli {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[arg(long, env = "BASE_URL")]
    pub base_url: String,

    #[arg(long, env = "USER_PASSWORD", hide_env_values = true)]
    pub user_password: String,

    /// Number of users to prepare.
    #[arg(short = 'n', long, env = "NUM_USERS_TO_PREPARE")]
    pub count: usize,

    #[arg(short, long, env = "PREPARED_USERS_FILE", default_value = DEFAULT_PREPARED_USERS_FILE)]
    pub output: PathBuf,
}

impl PrepareCli {
    pub fn into_config(self) -> Result<ProvisionConfig, ConfigError> {
        Ok(ProvisionConfig::new(
            self.database.into_config()?,
            &self.base_url,
            self.user_password,
            self.count,
        )?
        .output(self.output))
    }
}

/// Run the prayer → testimony → comment journey under staged load.
#[derive(Parser, Debug)]
#[command(name = "vigil-journey", version)]
pub struct JourneyCli {
    #[arg(long, env = "BASE_URL")]
    pub base_url: String,

    #[arg(short, long, env = "PREPARED_USERS_FILE", default_value = DEFAULT_PREPARED_USERS_FILE)]
    pub users: PathBuf,

    /// Ramp stage as DURATION:TARGET, e.g. `30s:10`. Repeat or comma-separate.
    #[arg(short, long = "stage", env = "VIGIL_STAGES", value_delimiter = ',')]
    pub stages: Vec<Stage>,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "2s")]
    pub max_req_p95: Duration,

    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    pub max_journey_p95: Duration,

    #[arg(long, default_value_t = vigil_core::DEFAULT_MAX_FAILED_RATE)]
    pub max_failed_rate: f64,

    #[arg(long, default_value = DEFAULT_SUMMARY_FILE)]
    pub summary: PathBuf,

    /// Expose Prometheus metrics on this address while the run is active.
    #[arg(long, env = "VIGIL_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl JourneyCli {
    pub fn into_config(self) -> Result<JourneyConfig, ConfigError> {
        let stages = if self.stages.is_empty() {
            Stage::parse_list(DEFAULT_STAGES)?
        } else {
            self.stages
        };

        JourneyConfig::new(&self.base_url, stages)?
            .users(self.users)
            .summary(self.summary)
            .thresholds(Thresholds {
                max_req_p95: self.max_req_p95,
                max_journey_p95: self.max_journey_p95,
                max_failed_rate: self.max_failed_rate,
            })
    }
}

/// Dump users with their prayers, testimonies and comments.
#[derive(Parser, Debug)]
#[command(name = "vigil-export", version)]
pub struct ExportCli {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
    pub output: PathBuf,
}

impl ExportCli {
    pub fn into_config(self) -> Result<ExportConfig, ConfigError> {
        Ok(ExportConfig::new(self.database.into_config()?).output(self.output))
    }
}

/// Installs the global `fmt` subscriber. `RUST_LOG` overrides the default
/// `vigil=info` filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    FmtSubscriber::builder().with_env_filter(filter).init();
}

pub fn install_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}
